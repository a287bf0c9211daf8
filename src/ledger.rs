//! The ledger coordinator.
//!
//! [`Ledger`] is the only code path that changes an item's quantity. Every
//! committed change is paired with exactly one transaction log entry whose
//! `change_amount` equals the quantity delta, written after the item:
//!
//! | Operation          | Item write         | Log entry                         |
//! |--------------------|--------------------|-----------------------------------|
//! | `add_item`         | create             | `Initial Stock`, always           |
//! | `edit_item`        | full edit          | `Restock`/`Usage` if delta != 0   |
//! | `adjust_quantity`  | quantity only      | `Restock`/`Usage`; skipped if 0   |
//! | `remove_item`      | hard delete        | none; history is left in place    |
//!
//! The pair is not atomic. When the log append fails after the item write the
//! item is kept and the caller gets [`LedgerError::PartialCommit`]; nothing is
//! retried. Concurrent writers are not isolated unless
//! [`LedgerOptions::optimistic_locking`] is on.

use crate::config::{LedgerOptions, StockroomConfig};
use crate::error::{LedgerError, LedgerOperation};
use crate::model::{Actor, EntryView, Item, ItemDraft, ItemEdit, ItemPatch, LogEntry, NewLogEntry};
use crate::postgres::{initialize_schema, PgExecutor, PgStore};
use crate::store::{ItemStore, MemoryStore, TransactionLog};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Point-in-time read of items and log, the input to every report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Ordered by name
    pub items: Vec<Item>,
    /// Newest first
    pub entries: Vec<EntryView>,
    pub taken_at: Option<DateTime<Utc>>,
}

/// Ledger coordinator over an item store and a transaction log
pub struct Ledger<I, L> {
    items: I,
    log: L,
    options: LedgerOptions,
}

impl Ledger<Arc<MemoryStore>, Arc<MemoryStore>> {
    /// Ledger over a fresh [`MemoryStore`] serving as both item store and log
    pub fn in_memory(options: LedgerOptions) -> Self {
        let store = Arc::new(MemoryStore::with_default_threshold(options.default_threshold));
        Self::with_options(Arc::clone(&store), store, options)
    }
}

impl Ledger<Arc<PgStore<PgExecutor>>, Arc<PgStore<PgExecutor>>> {
    /// Connect to PostgreSQL, create missing tables and build a ledger on top
    pub fn connect(config: &StockroomConfig) -> Result<Self, LedgerError> {
        config.database.validate()?;
        let executor = PgExecutor::connect(&config.database)?;
        initialize_schema(&executor)?;
        let store = Arc::new(PgStore::with_default_threshold(
            executor,
            config.ledger.default_threshold,
        ));
        Ok(Self::with_options(
            Arc::clone(&store),
            store,
            config.ledger.clone(),
        ))
    }

    /// [`StockroomConfig::load`] followed by [`Ledger::connect`]
    pub fn connect_from_env() -> Result<Self, LedgerError> {
        let config = StockroomConfig::load()?;
        Self::connect(&config)
    }
}

impl<I: ItemStore, L: TransactionLog> Ledger<I, L> {
    pub fn new(items: I, log: L) -> Self {
        Self::with_options(items, log, LedgerOptions::default())
    }

    pub fn with_options(items: I, log: L, options: LedgerOptions) -> Self {
        Self {
            items,
            log,
            options,
        }
    }

    pub fn options(&self) -> &LedgerOptions {
        &self.options
    }

    pub fn item_store(&self) -> &I {
        &self.items
    }

    pub fn transaction_log(&self) -> &L {
        &self.log
    }

    /// Create an item and write its `Initial Stock` entry.
    ///
    /// The initial entry is written even for a zero quantity.
    pub fn add_item(&self, actor: &Actor, draft: ItemDraft) -> Result<Item, LedgerError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::ledger_span(LedgerOperation::AddItem.as_str(), None).entered();

        let item = self.items.create(draft)?;
        let entry = NewLogEntry::initial_stock(item.id, item.quantity, actor);
        self.append_paired(item.id, LedgerOperation::AddItem, entry)?;

        #[cfg(feature = "metrics")]
        METRICS.record_mutation(LedgerOperation::AddItem.as_str());
        log::info!(
            "added item {} '{}' with {} in stock",
            item.id,
            item.name,
            item.quantity
        );
        Ok(item)
    }

    /// Replace the editable fields of an item.
    ///
    /// The delta is computed against the stored quantity, not against anything
    /// the caller read earlier. Edits that leave the quantity unchanged are
    /// persisted without a log entry.
    pub fn edit_item(&self, actor: &Actor, id: Uuid, edit: ItemEdit) -> Result<Item, LedgerError> {
        #[cfg(feature = "tracing")]
        let _span =
            tracing_helpers::ledger_span(LedgerOperation::EditItem.as_str(), Some(id)).entered();

        self.apply_with_delta(actor, id, ItemPatch::from(edit), LedgerOperation::EditItem)
    }

    /// Set an item's quantity; a no-op (no write, no entry) when unchanged
    pub fn adjust_quantity(
        &self,
        actor: &Actor,
        id: Uuid,
        new_quantity: i64,
    ) -> Result<Item, LedgerError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::ledger_span(LedgerOperation::AdjustQuantity.as_str(), Some(id))
            .entered();

        self.apply_with_delta(
            actor,
            id,
            ItemPatch::quantity_only(new_quantity),
            LedgerOperation::AdjustQuantity,
        )
    }

    /// Increase stock by `amount` (> 0)
    pub fn restock(&self, actor: &Actor, id: Uuid, amount: i64) -> Result<Item, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::Validation(format!(
                "restock amount must be positive, got {amount}"
            )));
        }
        let current = self.items.read(id)?;
        self.adjust_quantity(actor, id, current.quantity.saturating_add(amount))
    }

    /// Decrease stock by `amount` (> 0); stops at zero when clamping is on
    pub fn consume(&self, actor: &Actor, id: Uuid, amount: i64) -> Result<Item, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::Validation(format!(
                "usage amount must be positive, got {amount}"
            )));
        }
        let current = self.items.read(id)?;
        let mut target = current.quantity.saturating_sub(amount);
        if self.options.clamp_negative_quantities {
            target = target.max(0);
        }
        self.adjust_quantity(actor, id, target)
    }

    /// Hard-delete an item. Its log entries stay and read back as orphans.
    pub fn remove_item(&self, id: Uuid) -> Result<(), LedgerError> {
        #[cfg(feature = "tracing")]
        let _span =
            tracing_helpers::ledger_span(LedgerOperation::RemoveItem.as_str(), Some(id)).entered();

        self.items.delete(id)?;

        #[cfg(feature = "metrics")]
        METRICS.record_mutation(LedgerOperation::RemoveItem.as_str());
        log::info!("removed item {id}; its history is kept");
        Ok(())
    }

    pub fn item(&self, id: Uuid) -> Result<Item, LedgerError> {
        self.items.read(id)
    }

    /// Entries for one item, newest first; works for deleted items too
    pub fn item_history(&self, id: Uuid) -> Result<Vec<LogEntry>, LedgerError> {
        self.log.list_for_item(id)
    }

    /// Re-read items and log for the presentation layer
    pub fn refresh(&self) -> Result<Snapshot, LedgerError> {
        let items = self.items.list()?;
        let entries = self.log.list_all(self.options.history_limit)?;
        log::debug!(
            "refreshed snapshot: {} items, {} log entries",
            items.len(),
            entries.len()
        );
        Ok(Snapshot {
            items,
            entries,
            taken_at: Some(Utc::now()),
        })
    }

    fn apply_with_delta(
        &self,
        actor: &Actor,
        id: Uuid,
        mut patch: ItemPatch,
        operation: LedgerOperation,
    ) -> Result<Item, LedgerError> {
        let previous = self.items.read(id)?;

        if let Some(requested) = patch.quantity {
            if requested < 0 && self.options.clamp_negative_quantities {
                log::warn!("{operation} on item {id}: clamping quantity {requested} to 0");
                patch.quantity = Some(0);
            }
        }

        let delta = match patch.quantity {
            Some(quantity) => quantity.checked_sub(previous.quantity).ok_or_else(|| {
                LedgerError::Validation(format!(
                    "quantity {quantity} is out of range for item {id} holding {}",
                    previous.quantity
                ))
            })?,
            None => 0,
        };

        if delta == 0 && operation == LedgerOperation::AdjustQuantity {
            log::debug!("{operation} on item {id}: quantity unchanged, nothing written");
            return Ok(previous);
        }

        if self.options.optimistic_locking && patch.expected_version.is_none() {
            patch.expected_version = Some(previous.version);
        }

        let updated = self.items.update(id, &patch)?;

        if let Some(entry) = NewLogEntry::for_delta(id, delta, actor) {
            self.append_paired(id, operation, entry)?;
        }

        #[cfg(feature = "metrics")]
        METRICS.record_mutation(operation.as_str());
        log::info!(
            "{operation} on item {id}: quantity {} -> {} (delta {delta})",
            previous.quantity,
            updated.quantity
        );
        Ok(updated)
    }

    fn append_paired(
        &self,
        item_id: Uuid,
        operation: LedgerOperation,
        entry: NewLogEntry,
    ) -> Result<LogEntry, LedgerError> {
        match self.log.append(entry) {
            Ok(stored) => {
                #[cfg(feature = "metrics")]
                METRICS.record_log_entry(stored.action_type);
                Ok(stored)
            }
            Err(cause) => {
                #[cfg(feature = "metrics")]
                METRICS.record_partial_commit(operation.as_str());
                log::warn!(
                    "{operation} on item {item_id} committed without its log entry: {cause}"
                );
                Err(LedgerError::PartialCommit {
                    item_id,
                    operation,
                    cause: Box::new(cause),
                })
            }
        }
    }
}

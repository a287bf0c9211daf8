//! Storage seam for the ledger.
//!
//! The [`Ledger`](crate::ledger::Ledger) only ever talks to these traits, so
//! the same coordinator runs against the in-process [`MemoryStore`] and the
//! PostgreSQL [`PgStore`](crate::postgres::PgStore).

pub mod memory;

use crate::error::LedgerError;
use crate::model::{EntryView, Item, ItemDraft, ItemPatch, LogEntry, NewLogEntry, Profile};
use std::sync::Arc;
use uuid::Uuid;

pub use memory::MemoryStore;

/// Authoritative set of inventory items
pub trait ItemStore {
    /// Sanitize `draft` (see [`ItemDraft::sanitize`]) and insert it
    fn create(&self, draft: ItemDraft) -> Result<Item, LedgerError>;

    fn read(&self, id: Uuid) -> Result<Item, LedgerError>;

    /// All items ordered by name
    fn list(&self) -> Result<Vec<Item>, LedgerError>;

    /// Apply only the declared fields of `patch`.
    ///
    /// # Errors
    ///
    /// - `Validation` if the patch breaks an item invariant
    /// - `NotFound` if the item does not exist
    /// - `Conflict` if `patch.expected_version` does not match
    fn update(&self, id: Uuid, patch: &ItemPatch) -> Result<Item, LedgerError>;

    /// Hard delete; log entries for the item are left in place
    fn delete(&self, id: Uuid) -> Result<(), LedgerError>;
}

/// Append-only record of quantity changes
pub trait TransactionLog {
    /// Store one entry; either the whole record is written or nothing is
    fn append(&self, entry: NewLogEntry) -> Result<LogEntry, LedgerError>;

    /// Entries for one item, newest first
    fn list_for_item(&self, item_id: Uuid) -> Result<Vec<LogEntry>, LedgerError>;

    /// All entries joined with item and actor names, newest first
    fn list_all(&self, limit: Option<usize>) -> Result<Vec<EntryView>, LedgerError>;
}

/// Read access to the external profile service
pub trait ProfileDirectory {
    fn get_profile(&self, actor_id: Uuid) -> Result<Option<Profile>, LedgerError>;
}

impl<T: ItemStore + ?Sized> ItemStore for Arc<T> {
    fn create(&self, draft: ItemDraft) -> Result<Item, LedgerError> {
        (**self).create(draft)
    }

    fn read(&self, id: Uuid) -> Result<Item, LedgerError> {
        (**self).read(id)
    }

    fn list(&self) -> Result<Vec<Item>, LedgerError> {
        (**self).list()
    }

    fn update(&self, id: Uuid, patch: &ItemPatch) -> Result<Item, LedgerError> {
        (**self).update(id, patch)
    }

    fn delete(&self, id: Uuid) -> Result<(), LedgerError> {
        (**self).delete(id)
    }
}

impl<T: TransactionLog + ?Sized> TransactionLog for Arc<T> {
    fn append(&self, entry: NewLogEntry) -> Result<LogEntry, LedgerError> {
        (**self).append(entry)
    }

    fn list_for_item(&self, item_id: Uuid) -> Result<Vec<LogEntry>, LedgerError> {
        (**self).list_for_item(item_id)
    }

    fn list_all(&self, limit: Option<usize>) -> Result<Vec<EntryView>, LedgerError> {
        (**self).list_all(limit)
    }
}

impl<T: ProfileDirectory + ?Sized> ProfileDirectory for Arc<T> {
    fn get_profile(&self, actor_id: Uuid) -> Result<Option<Profile>, LedgerError> {
        (**self).get_profile(actor_id)
    }
}

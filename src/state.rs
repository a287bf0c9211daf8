//! Presentation state.
//!
//! [`DashboardState`] holds the last [`Snapshot`] plus the view selections and
//! derives every report from it. It never mutates items: intents go through
//! [`Ledger`](crate::ledger::Ledger), and the fresh snapshot is handed back via
//! [`DashboardState::apply_snapshot`].

use crate::config::LedgerOptions;
use crate::ledger::Snapshot;
use crate::model::{Item, LogEntry};
use crate::report::{self, StockHistogram, UsageTotal, DEFAULT_TOP_USED};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct DashboardState {
    snapshot: Snapshot,
    search: String,
    selected: Option<Uuid>,
    top_used_limit: usize,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_USED)
    }
}

impl DashboardState {
    pub fn new(top_used_limit: usize) -> Self {
        Self {
            snapshot: Snapshot::default(),
            search: String::new(),
            selected: None,
            top_used_limit,
        }
    }

    /// Ranking length taken from `[ledger] top_used_limit`
    pub fn for_options(options: &LedgerOptions) -> Self {
        Self::new(options.top_used_limit)
    }

    /// Replace the snapshot; a selection whose item is gone is dropped
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshot = snapshot;
        if let Some(id) = self.selected {
            if !self.snapshot.items.iter().any(|item| item.id == id) {
                log::debug!("selected item {id} no longer exists, clearing selection");
                self.selected = None;
            }
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Select an item for the detail view; unknown ids clear the selection
    pub fn select(&mut self, id: Option<Uuid>) {
        self.selected = id.filter(|id| self.snapshot.items.iter().any(|item| item.id == *id));
    }

    pub fn visible_items(&self) -> Vec<&Item> {
        report::filter_items(&self.snapshot.items, &self.search)
    }

    /// Histogram over all items, regardless of the search
    pub fn stock_status(&self) -> StockHistogram {
        report::stock_status_histogram(&self.snapshot.items)
    }

    pub fn top_used(&self) -> Vec<UsageTotal> {
        report::top_used_items(&self.snapshot.entries, self.top_used_limit)
    }

    pub fn low_stock_items(&self) -> Vec<&Item> {
        self.snapshot
            .items
            .iter()
            .filter(|item| item.is_low_stock())
            .collect()
    }

    pub fn selected_item(&self) -> Option<&Item> {
        let id = self.selected?;
        self.snapshot.items.iter().find(|item| item.id == id)
    }

    pub fn selected_history(&self) -> Vec<&LogEntry> {
        match self.selected {
            Some(id) => report::history_for_item(&self.snapshot.entries, id),
            None => Vec::new(),
        }
    }
}

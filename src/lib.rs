//! # Stockroom
//!
//! Inventory stock ledger for the `may` coroutine runtime.
//!
//! Every change to an item's quantity goes through [`Ledger`], which pairs it
//! with one append-only transaction log entry. Items and entries live behind
//! the [`ItemStore`] and [`TransactionLog`] traits, implemented in memory by
//! [`MemoryStore`] and over PostgreSQL by [`PgStore`]. The [`report`] module
//! derives stock status counts, usage rankings and low-stock flags from a
//! [`Snapshot`], and [`DashboardState`] keeps that snapshot for a UI.
//!
//! ```no_run
//! use stockroom::{Actor, ItemDraft, Ledger, LedgerOptions};
//! use uuid::Uuid;
//!
//! let ledger = Ledger::in_memory(LedgerOptions::default());
//! let actor = Actor::new(Uuid::new_v4(), "tech@lab.example");
//! let item = ledger.add_item(&actor, ItemDraft::named("PLA Filament").quantity(10))?;
//! ledger.adjust_quantity(&actor, item.id, 3)?;
//! let histogram = stockroom::report::stock_status_histogram(&ledger.refresh()?.items);
//! assert_eq!(histogram.low_stock, 1);
//! # Ok::<(), stockroom::LedgerError>(())
//! ```

pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod model;
pub mod postgres;
pub mod report;
pub mod state;
pub mod store;

pub use config::{DatabaseConfig, LedgerOptions, StockroomConfig};
pub use error::{LedgerError, LedgerOperation, RecordKind};
pub use ledger::{Ledger, Snapshot};
pub use model::{
    ActionType, Actor, Category, EntryView, Item, ItemDraft, ItemEdit, ItemPatch, LogEntry,
    Profile, Session, StockStatus,
};
pub use postgres::{PgExecutor, PgStore, SqlExecutor};
pub use state::DashboardState;
pub use store::{ItemStore, MemoryStore, ProfileDirectory, TransactionLog};

//! Closed record types for items, log entries and identities.

pub mod actor;
pub mod entry;
pub mod item;

pub use actor::{Actor, Profile, Session};
pub use entry::{ActionType, EntryView, LogEntry, NewLogEntry};
pub use item::{Category, Item, ItemDraft, ItemEdit, ItemPatch, NewItem, StockStatus};

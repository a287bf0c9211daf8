//! Error taxonomy for the stock ledger.
//!
//! Every fallible operation in the crate returns [`LedgerError`]. Storage
//! backends translate their own failures into `StorageUnavailable` (or
//! `NotFound`/`Conflict` when the row state explains the failure), and the
//! [`Ledger`](crate::ledger::Ledger) adds `PartialCommit` when only the first
//! half of an item-write/log-append pair went through.

use std::fmt;
use uuid::Uuid;

/// What kind of record a `NotFound` refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Item,
    Profile,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Item => write!(f, "item"),
            RecordKind::Profile => write!(f, "profile"),
        }
    }
}

/// Which coordinator operation left the ledger half-written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOperation {
    AddItem,
    EditItem,
    AdjustQuantity,
    RemoveItem,
}

impl LedgerOperation {
    /// Stable name used in log lines, spans and metric attributes
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerOperation::AddItem => "add_item",
            LedgerOperation::EditItem => "edit_item",
            LedgerOperation::AdjustQuantity => "adjust_quantity",
            LedgerOperation::RemoveItem => "remove_item",
        }
    }
}

impl fmt::Display for LedgerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger error type
#[derive(Debug)]
pub enum LedgerError {
    /// Caller-supplied data rejected before reaching storage
    Validation(String),
    /// Target record absent
    NotFound { kind: RecordKind, id: Uuid },
    /// The backing store could not be reached or rejected the call
    StorageUnavailable(String),
    /// The item write committed but the paired log append failed.
    ///
    /// The item write is not rolled back; `cause` is the append failure.
    PartialCommit {
        item_id: Uuid,
        operation: LedgerOperation,
        cause: Box<LedgerError>,
    },
    /// The stored item changed since the caller read it
    Conflict { id: Uuid, expected: i64, actual: i64 },
}

impl LedgerError {
    /// Shorthand for a missing item
    pub fn item_not_found(id: Uuid) -> Self {
        LedgerError::NotFound {
            kind: RecordKind::Item,
            id,
        }
    }

    /// Whether reissuing the same intent can succeed without changing it.
    ///
    /// `PartialCommit` is not retriable: the item half already landed, and
    /// replaying the intent would compute a zero delta.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            LedgerError::StorageUnavailable(_) | LedgerError::Conflict { .. }
        )
    }

    /// True for `NotFound` on an item
    pub fn is_item_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::NotFound {
                kind: RecordKind::Item,
                ..
            }
        )
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Validation(msg) => write!(f, "Validation failed: {msg}"),
            LedgerError::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            LedgerError::StorageUnavailable(msg) => write!(f, "Storage unavailable: {msg}"),
            LedgerError::PartialCommit {
                item_id,
                operation,
                cause,
            } => write!(
                f,
                "Partial commit during {operation} on item {item_id}: \
                 item was written but the transaction log append failed ({cause})"
            ),
            LedgerError::Conflict {
                id,
                expected,
                actual,
            } => write!(
                f,
                "Item {id} was modified concurrently: expected version {expected}, found {actual}"
            ),
        }
    }
}

impl std::error::Error for LedgerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LedgerError::PartialCommit { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl From<crate::postgres::ExecutorError> for LedgerError {
    fn from(err: crate::postgres::ExecutorError) -> Self {
        LedgerError::StorageUnavailable(err.to_string())
    }
}

impl From<config::ConfigError> for LedgerError {
    fn from(err: config::ConfigError) -> Self {
        LedgerError::Validation(format!("Invalid configuration: {err}"))
    }
}

//! Transaction log entries.

use crate::error::LedgerError;
use crate::model::actor::Actor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Label used when an entry's item no longer resolves
pub const UNKNOWN_ITEM_LABEL: &str = "Unknown";

/// Why a quantity changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    /// Written once when an item is created, even for a zero quantity
    #[serde(rename = "Initial Stock")]
    InitialStock,
    Restock,
    Usage,
}

impl ActionType {
    /// `Restock` for growth, `Usage` for shrinkage, `None` for no change
    pub fn for_delta(delta: i64) -> Option<Self> {
        match delta.signum() {
            1 => Some(ActionType::Restock),
            -1 => Some(ActionType::Usage),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::InitialStock => "Initial Stock",
            ActionType::Restock => "Restock",
            ActionType::Usage => "Usage",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Initial Stock" => Ok(ActionType::InitialStock),
            "Restock" => Ok(ActionType::Restock),
            "Usage" => Ok(ActionType::Usage),
            other => Err(LedgerError::Validation(format!("unknown action type '{other}'"))),
        }
    }
}

/// An entry about to be appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    pub item_id: Uuid,
    pub change_amount: i64,
    pub action_type: ActionType,
    pub actor_id: Uuid,
    pub actor_email: String,
}

impl NewLogEntry {
    /// Only `InitialStock` may carry a zero amount.
    pub fn new(
        item_id: Uuid,
        change_amount: i64,
        action_type: ActionType,
        actor: &Actor,
    ) -> Result<Self, LedgerError> {
        if change_amount == 0 && action_type != ActionType::InitialStock {
            return Err(LedgerError::Validation(format!(
                "{action_type} entry for item {item_id} must not have a zero change amount"
            )));
        }
        Ok(Self {
            item_id,
            change_amount,
            action_type,
            actor_id: actor.id,
            actor_email: actor.email.clone(),
        })
    }

    /// Opening entry for a freshly created item
    pub fn initial_stock(item_id: Uuid, quantity: i64, actor: &Actor) -> Self {
        Self {
            item_id,
            change_amount: quantity,
            action_type: ActionType::InitialStock,
            actor_id: actor.id,
            actor_email: actor.email.clone(),
        }
    }

    /// Entry for a quantity change; `None` when `delta` is zero
    pub fn for_delta(item_id: Uuid, delta: i64, actor: &Actor) -> Option<Self> {
        ActionType::for_delta(delta).map(|action_type| Self {
            item_id,
            change_amount: delta,
            action_type,
            actor_id: actor.id,
            actor_email: actor.email.clone(),
        })
    }

    pub fn into_entry(self, id: Uuid, timestamp: DateTime<Utc>) -> LogEntry {
        LogEntry {
            id,
            item_id: self.item_id,
            change_amount: self.change_amount,
            action_type: self.action_type,
            actor_id: self.actor_id,
            actor_email: self.actor_email,
            timestamp,
        }
    }
}

/// An immutable, stored audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    /// Weak reference; the item may since have been deleted
    pub item_id: Uuid,
    pub change_amount: i64,
    pub action_type: ActionType,
    pub actor_id: Uuid,
    /// Captured at write time, survives profile changes
    pub actor_email: String,
    pub timestamp: DateTime<Utc>,
}

/// A log entry joined with the names it refers to at read time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryView {
    pub entry: LogEntry,
    pub item_name: Option<String>,
    pub actor_name: Option<String>,
}

impl EntryView {
    pub fn unresolved(entry: LogEntry) -> Self {
        Self {
            entry,
            item_name: None,
            actor_name: None,
        }
    }

    /// Item name, or "Unknown" once the item is gone
    pub fn item_label(&self) -> &str {
        self.item_name.as_deref().unwrap_or(UNKNOWN_ITEM_LABEL)
    }

    /// Actor's full name, or the email stored with the entry
    pub fn actor_label(&self) -> &str {
        match self.actor_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.entry.actor_email,
        }
    }

    pub fn is_orphaned(&self) -> bool {
        self.item_name.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> Actor {
        Actor::new(Uuid::new_v4(), "maker@lab.example")
    }

    #[test]
    fn test_action_type_for_delta() {
        assert_eq!(ActionType::for_delta(4), Some(ActionType::Restock));
        assert_eq!(ActionType::for_delta(-7), Some(ActionType::Usage));
        assert_eq!(ActionType::for_delta(0), None);
    }

    #[test]
    fn test_action_type_labels_round_trip() {
        for action in [ActionType::InitialStock, ActionType::Restock, ActionType::Usage] {
            assert_eq!(action.as_str().parse::<ActionType>().unwrap(), action);
        }
        assert!("Theft".parse::<ActionType>().is_err());
        assert_eq!(
            serde_json::to_string(&ActionType::InitialStock).unwrap(),
            "\"Initial Stock\""
        );
    }

    #[test]
    fn test_zero_amount_only_allowed_for_initial_stock() {
        let actor = actor();
        let item_id = Uuid::new_v4();
        assert!(NewLogEntry::new(item_id, 0, ActionType::InitialStock, &actor).is_ok());
        assert!(NewLogEntry::new(item_id, 0, ActionType::Restock, &actor).is_err());
        assert!(NewLogEntry::new(item_id, 0, ActionType::Usage, &actor).is_err());
        assert!(NewLogEntry::for_delta(item_id, 0, &actor).is_none());
    }

    #[test]
    fn test_entry_captures_actor_email() {
        let actor = actor();
        let entry = NewLogEntry::for_delta(Uuid::new_v4(), -2, &actor)
            .unwrap()
            .into_entry(Uuid::new_v4(), Utc::now());
        assert_eq!(entry.action_type, ActionType::Usage);
        assert_eq!(entry.actor_id, actor.id);
        assert_eq!(entry.actor_email, "maker@lab.example");
    }

    #[test]
    fn test_entry_view_fallbacks() {
        let entry = NewLogEntry::initial_stock(Uuid::new_v4(), 3, &actor())
            .into_entry(Uuid::new_v4(), Utc::now());
        let view = EntryView::unresolved(entry);
        assert_eq!(view.item_label(), "Unknown");
        assert_eq!(view.actor_label(), "maker@lab.example");
        assert!(view.is_orphaned());

        let named = EntryView {
            item_name: Some("Laser cutter".to_string()),
            actor_name: Some("Ada Lovelace".to_string()),
            ..view
        };
        assert_eq!(named.item_label(), "Laser cutter");
        assert_eq!(named.actor_label(), "Ada Lovelace");
    }
}

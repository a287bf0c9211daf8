//! In-process backend.
//!
//! Coroutine-safe through `may::sync::Mutex`, so a single `Arc<MemoryStore>`
//! can back a [`Ledger`](crate::ledger::Ledger) shared by many `may`
//! coroutines. It holds items, log entries and profiles the same way the
//! relational backend does, including the read-time join.

use super::{ItemStore, ProfileDirectory, TransactionLog};
use crate::error::{LedgerError, RecordKind};
use crate::model::item::DEFAULT_THRESHOLD;
use crate::model::{EntryView, Item, ItemDraft, ItemPatch, LogEntry, NewLogEntry, Profile};
use chrono::Utc;
use may::sync::{Mutex, MutexGuard};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    items: HashMap<Uuid, Item>,
    // Insertion order; never reordered or edited
    entries: Vec<LogEntry>,
    profiles: HashMap<Uuid, Profile>,
}

/// Items, log and profiles kept in memory
pub struct MemoryStore {
    default_threshold: i64,
    tables: Mutex<Tables>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_default_threshold(DEFAULT_THRESHOLD)
    }

    /// Use `default_threshold` for drafts that omit a threshold
    pub fn with_default_threshold(default_threshold: i64) -> Self {
        Self {
            default_threshold,
            tables: Mutex::new(Tables::default()),
        }
    }

    /// Insert or replace a profile (the profile service's write side)
    pub fn upsert_profile(&self, profile: Profile) -> Result<(), LedgerError> {
        let mut tables = self.lock()?;
        tables.profiles.insert(profile.id, profile);
        Ok(())
    }

    /// Drop a profile, as when an account is removed
    pub fn remove_profile(&self, actor_id: Uuid) -> Result<(), LedgerError> {
        let mut tables = self.lock()?;
        tables
            .profiles
            .remove(&actor_id)
            .map(|_| ())
            .ok_or(LedgerError::NotFound {
                kind: RecordKind::Profile,
                id: actor_id,
            })
    }

    /// Number of stored log entries, orphans included
    pub fn entry_count(&self) -> Result<usize, LedgerError> {
        Ok(self.lock()?.entries.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, LedgerError> {
        self.tables
            .lock()
            .map_err(|_| LedgerError::StorageUnavailable("memory store lock poisoned".to_string()))
    }
}

impl ItemStore for MemoryStore {
    fn create(&self, draft: ItemDraft) -> Result<Item, LedgerError> {
        let new_item = draft.sanitize(self.default_threshold)?;
        let item = new_item.into_item(Uuid::new_v4(), Utc::now());
        let mut tables = self.lock()?;
        tables.items.insert(item.id, item.clone());
        Ok(item)
    }

    fn read(&self, id: Uuid) -> Result<Item, LedgerError> {
        self.lock()?
            .items
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::item_not_found(id))
    }

    fn list(&self) -> Result<Vec<Item>, LedgerError> {
        let mut items: Vec<Item> = self.lock()?.items.values().cloned().collect();
        items.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(items)
    }

    fn update(&self, id: Uuid, patch: &ItemPatch) -> Result<Item, LedgerError> {
        patch.validate()?;
        let mut tables = self.lock()?;
        let item = tables
            .items
            .get_mut(&id)
            .ok_or_else(|| LedgerError::item_not_found(id))?;

        if let Some(expected) = patch.expected_version {
            if item.version != expected {
                return Err(LedgerError::Conflict {
                    id,
                    expected,
                    actual: item.version,
                });
            }
        }

        patch.apply_to(item);
        item.version += 1;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    fn delete(&self, id: Uuid) -> Result<(), LedgerError> {
        self.lock()?
            .items
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| LedgerError::item_not_found(id))
    }
}

impl TransactionLog for MemoryStore {
    fn append(&self, entry: NewLogEntry) -> Result<LogEntry, LedgerError> {
        let stored = entry.into_entry(Uuid::new_v4(), Utc::now());
        self.lock()?.entries.push(stored.clone());
        Ok(stored)
    }

    fn list_for_item(&self, item_id: Uuid) -> Result<Vec<LogEntry>, LedgerError> {
        let mut entries: Vec<LogEntry> = self
            .lock()?
            .entries
            .iter()
            .rev()
            .filter(|entry| entry.item_id == item_id)
            .cloned()
            .collect();
        // Stable: equal timestamps keep newest-inserted first
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    fn list_all(&self, limit: Option<usize>) -> Result<Vec<EntryView>, LedgerError> {
        let tables = self.lock()?;
        let mut views: Vec<EntryView> = tables
            .entries
            .iter()
            .rev()
            .map(|entry| EntryView {
                item_name: tables.items.get(&entry.item_id).map(|item| item.name.clone()),
                actor_name: tables
                    .profiles
                    .get(&entry.actor_id)
                    .and_then(Profile::full_name),
                entry: entry.clone(),
            })
            .collect();
        views.sort_by(|a, b| b.entry.timestamp.cmp(&a.entry.timestamp));
        if let Some(limit) = limit {
            views.truncate(limit);
        }
        Ok(views)
    }
}

impl ProfileDirectory for MemoryStore {
    fn get_profile(&self, actor_id: Uuid) -> Result<Option<Profile>, LedgerError> {
        Ok(self.lock()?.profiles.get(&actor_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionType, Actor, Category};

    fn actor() -> Actor {
        Actor::new(Uuid::new_v4(), "tech@lab.example")
    }

    #[test]
    fn test_create_sanitizes_draft() {
        let store = MemoryStore::new();
        let item = store.create(ItemDraft::default()).unwrap();
        assert_eq!(item.name, "Untitled Item");
        assert_eq!(item.quantity, 0);
        assert_eq!(item.threshold, 5);
        assert_eq!(item.version, 1);
        assert_eq!(store.read(item.id).unwrap(), item);
    }

    #[test]
    fn test_custom_default_threshold() {
        let store = MemoryStore::with_default_threshold(2);
        let item = store.create(ItemDraft::named("Gloves")).unwrap();
        assert_eq!(item.threshold, 2);
    }

    #[test]
    fn test_list_orders_by_name() {
        let store = MemoryStore::new();
        for name in ["zip ties", "Acrylic", "bandsaw blade", "M3 screws"] {
            store.create(ItemDraft::named(name)).unwrap();
        }
        let names: Vec<String> = store.list().unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["Acrylic", "bandsaw blade", "M3 screws", "zip ties"]);
    }

    #[test]
    fn test_update_only_changes_declared_fields() {
        let store = MemoryStore::new();
        let item = store
            .create(ItemDraft::named("Wood glue").quantity(8).category("Consumable"))
            .unwrap();
        let patch = ItemPatch {
            description: Some("PVA, 500ml".to_string()),
            ..ItemPatch::default()
        };
        let updated = store.update(item.id, &patch).unwrap();
        assert_eq!(updated.description, "PVA, 500ml");
        assert_eq!(updated.quantity, 8);
        assert_eq!(updated.category, Category::Consumable);
        assert_eq!(updated.version, 2);
    }

    #[test]
    fn test_update_missing_item() {
        let store = MemoryStore::new();
        let err = store
            .update(Uuid::new_v4(), &ItemPatch::quantity_only(1))
            .unwrap_err();
        assert!(err.is_item_not_found());
    }

    #[test]
    fn test_update_version_conflict() {
        let store = MemoryStore::new();
        let item = store.create(ItemDraft::named("Clamps").quantity(4)).unwrap();
        store.update(item.id, &ItemPatch::quantity_only(3)).unwrap();

        let stale = ItemPatch::quantity_only(2).with_expected_version(item.version);
        let err = store.update(item.id, &stale).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Conflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));
        assert_eq!(store.read(item.id).unwrap().quantity, 3);
    }

    #[test]
    fn test_delete_is_hard_and_keeps_entries() {
        let store = MemoryStore::new();
        let item = store.create(ItemDraft::named("Heat gun")).unwrap();
        store
            .append(NewLogEntry::initial_stock(item.id, 1, &actor()))
            .unwrap();
        store.delete(item.id).unwrap();

        assert!(store.read(item.id).unwrap_err().is_item_not_found());
        assert!(store.delete(item.id).unwrap_err().is_item_not_found());
        assert_eq!(store.entry_count().unwrap(), 1);

        let views = store.list_all(None).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].item_label(), "Unknown");
    }

    #[test]
    fn test_list_all_newest_first_with_limit() {
        let store = MemoryStore::new();
        let actor = actor();
        let item = store.create(ItemDraft::named("Filament")).unwrap();
        store
            .append(NewLogEntry::initial_stock(item.id, 10, &actor))
            .unwrap();
        store
            .append(NewLogEntry::for_delta(item.id, -3, &actor).unwrap())
            .unwrap();
        store
            .append(NewLogEntry::for_delta(item.id, 5, &actor).unwrap())
            .unwrap();

        let all = store.list_all(None).unwrap();
        let amounts: Vec<i64> = all.iter().map(|v| v.entry.change_amount).collect();
        assert_eq!(amounts, vec![5, -3, 10]);

        let limited = store.list_all(Some(2)).unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].entry.action_type, ActionType::Restock);

        let for_item = store.list_for_item(item.id).unwrap();
        assert_eq!(for_item.len(), 3);
        assert_eq!(for_item[2].action_type, ActionType::InitialStock);
        assert!(store.list_for_item(Uuid::new_v4()).unwrap().is_empty());
    }

    #[test]
    fn test_list_all_joins_profile_names() {
        let store = MemoryStore::new();
        let actor = actor();
        let item = store.create(ItemDraft::named("Caliper")).unwrap();
        store
            .append(NewLogEntry::initial_stock(item.id, 1, &actor))
            .unwrap();

        assert_eq!(store.list_all(None).unwrap()[0].actor_label(), "tech@lab.example");

        store
            .upsert_profile(Profile {
                id: actor.id,
                first_name: Some("Ada".to_string()),
                last_name: Some("Lovelace".to_string()),
                ..Profile::default()
            })
            .unwrap();
        let view = &store.list_all(None).unwrap()[0];
        assert_eq!(view.actor_label(), "Ada Lovelace");
        assert_eq!(view.item_label(), "Caliper");

        store.remove_profile(actor.id).unwrap();
        assert_eq!(store.list_all(None).unwrap()[0].actor_label(), "tech@lab.example");
        assert!(store.get_profile(actor.id).unwrap().is_none());
    }
}

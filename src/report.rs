//! Derived views over a snapshot.
//!
//! Everything here is a pure function of the items and entries passed in and
//! cannot fail; unresolved names degrade to their fallbacks.

use crate::model::{ActionType, EntryView, Item, LogEntry, StockStatus};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Default length of the top-used ranking
pub const DEFAULT_TOP_USED: usize = 5;

/// Item counts per stock status; every item lands in exactly one bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StockHistogram {
    pub in_stock: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
}

impl StockHistogram {
    pub fn total(&self) -> usize {
        self.in_stock + self.low_stock + self.out_of_stock
    }

    pub fn count(&self, status: StockStatus) -> usize {
        match status {
            StockStatus::InStock => self.in_stock,
            StockStatus::LowStock => self.low_stock,
            StockStatus::OutOfStock => self.out_of_stock,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageTotal {
    pub item_name: String,
    pub total_used: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowStockFlag {
    pub item_id: Uuid,
    pub name: String,
    pub quantity: i64,
    pub threshold: i64,
    pub low: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorUsage {
    pub actor: String,
    pub total_used: i64,
}

pub fn stock_status_histogram(items: &[Item]) -> StockHistogram {
    items
        .iter()
        .fold(StockHistogram::default(), |mut histogram, item| {
            match item.stock_status() {
                StockStatus::InStock => histogram.in_stock += 1,
                StockStatus::LowStock => histogram.low_stock += 1,
                StockStatus::OutOfStock => histogram.out_of_stock += 1,
            }
            histogram
        })
}

/// Usage entries summed per resolved item name, largest first, at most `n`.
///
/// Entries of deleted items are grouped under "Unknown". Ties keep the order in
/// which the names first appear in `entries`.
pub fn top_used_items(entries: &[EntryView], n: usize) -> Vec<UsageTotal> {
    let mut totals: Vec<UsageTotal> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for view in entries
        .iter()
        .filter(|view| view.entry.action_type == ActionType::Usage)
    {
        let name = view.item_label();
        let used = view.entry.change_amount.saturating_abs();
        match index.get(name) {
            Some(&slot) => {
                totals[slot].total_used = totals[slot].total_used.saturating_add(used)
            }
            None => {
                index.insert(name, totals.len());
                totals.push(UsageTotal {
                    item_name: name.to_string(),
                    total_used: used,
                });
            }
        }
    }

    // sort_by is stable
    totals.sort_by(|a, b| b.total_used.cmp(&a.total_used));
    totals.truncate(n);
    totals
}

/// Case-insensitive substring match on name or category label.
///
/// The query is matched as typed, whitespace included. Only the empty query
/// returns every item, in its original order.
pub fn filter_items<'a>(items: &'a [Item], query: &str) -> Vec<&'a Item> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|item| {
            item.name.to_lowercase().contains(&needle)
                || item.category.as_str().to_lowercase().contains(&needle)
        })
        .collect()
}

pub fn low_stock_flags(items: &[Item]) -> Vec<LowStockFlag> {
    items
        .iter()
        .map(|item| LowStockFlag {
            item_id: item.id,
            name: item.name.clone(),
            quantity: item.quantity,
            threshold: item.threshold,
            low: item.is_low_stock(),
        })
        .collect()
}

/// Entries for one item, in the order given (newest first for a snapshot)
pub fn history_for_item(entries: &[EntryView], item_id: Uuid) -> Vec<&LogEntry> {
    entries
        .iter()
        .map(|view| &view.entry)
        .filter(|entry| entry.item_id == item_id)
        .collect()
}

/// Units consumed per actor label, largest first
pub fn usage_by_actor(entries: &[EntryView]) -> Vec<ActorUsage> {
    let mut totals: Vec<ActorUsage> = Vec::new();
    for view in entries
        .iter()
        .filter(|view| view.entry.action_type == ActionType::Usage)
    {
        let actor = view.actor_label();
        let used = view.entry.change_amount.saturating_abs();
        match totals.iter_mut().find(|total| total.actor == actor) {
            Some(total) => total.total_used = total.total_used.saturating_add(used),
            None => totals.push(ActorUsage {
                actor: actor.to_string(),
                total_used: used,
            }),
        }
    }
    totals.sort_by(|a, b| b.total_used.cmp(&a.total_used));
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Actor, Category, ItemDraft, NewLogEntry};
    use chrono::{Duration, Utc};

    fn item(name: &str, category: Category, quantity: i64, threshold: i64) -> Item {
        let mut item = ItemDraft::named(name)
            .quantity(quantity.max(0))
            .threshold(threshold)
            .sanitize(5)
            .unwrap()
            .into_item(Uuid::new_v4(), Utc::now());
        item.category = category;
        item.quantity = quantity;
        item
    }

    fn view(item_name: Option<&str>, action: ActionType, amount: i64, minutes_ago: i64) -> EntryView {
        let actor = Actor::new(Uuid::new_v4(), "maker@lab.example");
        let entry = NewLogEntry::new(Uuid::new_v4(), amount, action, &actor)
            .unwrap()
            .into_entry(Uuid::new_v4(), Utc::now() - Duration::minutes(minutes_ago));
        EntryView {
            entry,
            item_name: item_name.map(str::to_string),
            actor_name: None,
        }
    }

    #[test]
    fn test_histogram_partitions_items() {
        let items = vec![
            item("Filament", Category::Consumable, 10, 5),
            item("Glue", Category::Consumable, 5, 5),
            item("Drill bits", Category::Tool, 0, 2),
            item("Scraps", Category::Miscellaneous, -2, 0),
            item("Oscilloscope", Category::Equipment, 1, 0),
        ];
        let histogram = stock_status_histogram(&items);
        assert_eq!(histogram.in_stock, 2);
        assert_eq!(histogram.low_stock, 1);
        assert_eq!(histogram.out_of_stock, 2);
        assert_eq!(histogram.total(), items.len());
        assert_eq!(histogram.count(StockStatus::LowStock), 1);
    }

    #[test]
    fn test_histogram_empty() {
        assert_eq!(stock_status_histogram(&[]), StockHistogram::default());
    }

    #[test]
    fn test_top_used_items_ranks_usage_only() {
        let entries = vec![
            view(Some("Filament"), ActionType::Usage, -3, 1),
            view(Some("Resin"), ActionType::Usage, -4, 2),
            view(Some("Filament"), ActionType::Restock, 50, 3),
            view(Some("Filament"), ActionType::Usage, -2, 4),
            view(None, ActionType::Usage, -1, 5),
            view(Some("Resin"), ActionType::InitialStock, 9, 6),
        ];
        let top = top_used_items(&entries, DEFAULT_TOP_USED);
        assert_eq!(
            top,
            vec![
                UsageTotal {
                    item_name: "Filament".to_string(),
                    total_used: 5
                },
                UsageTotal {
                    item_name: "Resin".to_string(),
                    total_used: 4
                },
                UsageTotal {
                    item_name: "Unknown".to_string(),
                    total_used: 1
                },
            ]
        );
    }

    #[test]
    fn test_top_used_items_truncates_and_keeps_first_seen_on_ties() {
        let entries: Vec<EntryView> = ["Tape", "Wire", "Pins", "Nails", "Screws", "Bolts"]
            .iter()
            .enumerate()
            .map(|(i, name)| view(Some(name), ActionType::Usage, -2, i as i64))
            .collect();
        let top = top_used_items(&entries, 3);
        let names: Vec<&str> = top.iter().map(|u| u.item_name.as_str()).collect();
        assert_eq!(names, vec!["Tape", "Wire", "Pins"]);
        assert!(top_used_items(&entries, 0).is_empty());
    }

    #[test]
    fn test_filter_items() {
        let items = vec![
            item("PLA Filament", Category::Consumable, 10, 5),
            item("Hammer", Category::Tool, 1, 0),
            item("Laser cutter", Category::Equipment, 1, 0),
        ];
        let all = filter_items(&items, "");
        assert_eq!(all.len(), 3);
        assert!(all.iter().zip(&items).all(|(a, b)| a.id == b.id));

        let by_name = filter_items(&items, "fila");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].name, "PLA Filament");

        let by_category = filter_items(&items, "TOOL");
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].name, "Hammer");

        assert!(filter_items(&items, "router").is_empty());
    }

    #[test]
    fn test_filter_items_keeps_whitespace_in_query() {
        let items = vec![
            item("Hammer", Category::Tool, 1, 0),
            item("PLA Filament", Category::Consumable, 10, 5),
            item("PLAnks", Category::Consumable, 4, 1),
        ];
        let names = |query: &str| -> Vec<String> {
            filter_items(&items, query)
                .into_iter()
                .map(|item| item.name.clone())
                .collect()
        };
        assert_eq!(names(" "), vec!["PLA Filament"]);
        assert_eq!(names("   "), Vec::<String>::new());
        assert_eq!(names("pla "), vec!["PLA Filament"]);
        assert_eq!(names("pla"), vec!["PLA Filament", "PLAnks"]);
    }

    #[test]
    fn test_usage_totals_saturate() {
        let entries = vec![
            view(Some("Bulk stock"), ActionType::Usage, i64::MIN, 1),
            view(Some("Bulk stock"), ActionType::Usage, -5, 2),
        ];
        let top = top_used_items(&entries, DEFAULT_TOP_USED);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].total_used, i64::MAX);

        let by_actor = usage_by_actor(&entries);
        assert_eq!(by_actor.len(), 1);
        assert_eq!(by_actor[0].total_used, i64::MAX);
    }

    #[test]
    fn test_low_stock_flags_threshold_inclusive() {
        let items = vec![
            item("Glue", Category::Consumable, 5, 5),
            item("Filament", Category::Consumable, 6, 5),
        ];
        let flags = low_stock_flags(&items);
        assert!(flags[0].low);
        assert!(!flags[1].low);
        assert_eq!(flags[1].threshold, 5);
    }

    #[test]
    fn test_history_for_item() {
        let mut entries = vec![
            view(Some("Glue"), ActionType::Usage, -1, 1),
            view(Some("Tape"), ActionType::Usage, -1, 2),
        ];
        let glue = entries[0].entry.item_id;
        entries.push(EntryView {
            entry: NewLogEntry::new(glue, 4, ActionType::Restock, &Actor::new(Uuid::new_v4(), "a@b.example"))
                .unwrap()
                .into_entry(Uuid::new_v4(), Utc::now()),
            item_name: Some("Glue".to_string()),
            actor_name: None,
        });
        let history = history_for_item(&entries, glue);
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].change_amount, 4);
    }

    #[test]
    fn test_usage_by_actor_falls_back_to_email() {
        let mut named = view(Some("Glue"), ActionType::Usage, -6, 1);
        named.actor_name = Some("Ada Lovelace".to_string());
        let entries = vec![
            view(Some("Glue"), ActionType::Usage, -2, 2),
            named,
            view(Some("Tape"), ActionType::Usage, -1, 3),
            view(Some("Tape"), ActionType::Restock, 10, 4),
        ];
        let usage = usage_by_actor(&entries);
        assert_eq!(
            usage,
            vec![
                ActorUsage {
                    actor: "Ada Lovelace".to_string(),
                    total_used: 6
                },
                ActorUsage {
                    actor: "maker@lab.example".to_string(),
                    total_used: 3
                },
            ]
        );
    }
}

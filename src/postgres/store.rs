//! [`ItemStore`], [`TransactionLog`] and [`ProfileDirectory`] over PostgreSQL.

use super::executor::{ExecutorError, SqlExecutor};
use crate::error::LedgerError;
use crate::model::item::DEFAULT_THRESHOLD;
use crate::model::{
    ActionType, Category, EntryView, Item, ItemDraft, ItemPatch, LogEntry, NewLogEntry, Profile,
};
use crate::store::{ItemStore, ProfileDirectory, TransactionLog};
use chrono::Utc;
use may_postgres::types::FromSql;
use may_postgres::Row;
use uuid::Uuid;

const ITEM_COLUMNS: &str = "id, item_name, category, quantity, threshold, location, description, \
                            color_code, tags, image_url, version, created_at, updated_at";

const ENTRY_COLUMNS: &str = "id, item_id, change_amount, action_type, user_id, user_email, \"timestamp\"";

const INSERT_ITEM: &str = "INSERT INTO inventory (id, item_name, category, quantity, threshold, location, \
     description, color_code, tags, image_url, version, created_at, updated_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 1, $11, $11)";

// Undeclared fields keep their stored value; $10 says whether image_url is declared
const UPDATE_ITEM: &str = "UPDATE inventory SET \
     item_name = COALESCE($2, item_name), \
     category = COALESCE($3, category), \
     quantity = COALESCE($4, quantity), \
     threshold = COALESCE($5, threshold), \
     location = COALESCE($6, location), \
     description = COALESCE($7, description), \
     color_code = COALESCE($8, color_code), \
     tags = COALESCE($9, tags), \
     image_url = CASE WHEN $10 THEN $11 ELSE image_url END, \
     version = version + 1, \
     updated_at = now() \
     WHERE id = $1 AND ($12::BIGINT IS NULL OR version = $12)";

const INSERT_ENTRY: &str = "INSERT INTO transaction_log (id, item_id, change_amount, action_type, user_id, user_email) \
     VALUES ($1, $2, $3, $4, $5, $6)";

const SELECT_JOINED_ENTRIES: &str = "SELECT l.id, l.item_id, l.change_amount, l.action_type, l.user_id, \
     l.user_email, l.\"timestamp\", i.item_name, p.first_name, p.last_name \
     FROM transaction_log l \
     LEFT JOIN inventory i ON i.id = l.item_id \
     LEFT JOIN profiles p ON p.id = l.user_id \
     ORDER BY l.\"timestamp\" DESC, l.seq DESC \
     LIMIT $1";

/// Relational backend; every statement goes through a [`SqlExecutor`]
pub struct PgStore<E: SqlExecutor> {
    executor: E,
    default_threshold: i64,
}

impl<E: SqlExecutor> PgStore<E> {
    pub fn new(executor: E) -> Self {
        Self::with_default_threshold(executor, DEFAULT_THRESHOLD)
    }

    pub fn with_default_threshold(executor: E, default_threshold: i64) -> Self {
        Self {
            executor,
            default_threshold,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    fn fetch_item(&self, id: Uuid) -> Result<Option<Item>, LedgerError> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM inventory WHERE id = $1");
        let rows = self.executor.query_all(&query, &[&id])?;
        rows.first().map(item_from_row).transpose().map_err(LedgerError::from)
    }
}

impl<E: SqlExecutor> ItemStore for PgStore<E> {
    fn create(&self, draft: ItemDraft) -> Result<Item, LedgerError> {
        let new_item = draft.sanitize(self.default_threshold)?;
        let id = Uuid::new_v4();
        let now = Utc::now();
        let category = new_item.category.as_str();

        self.executor.execute(
            INSERT_ITEM,
            &[
                &id,
                &new_item.name,
                &category,
                &new_item.quantity,
                &new_item.threshold,
                &new_item.location,
                &new_item.description,
                &new_item.color_code,
                &new_item.tags,
                &new_item.image_ref,
                &now,
            ],
        )?;

        // Re-read so timestamps carry the database's precision
        self.fetch_item(id)?.ok_or_else(|| {
            LedgerError::StorageUnavailable(format!("inserted item {id} could not be read back"))
        })
    }

    fn read(&self, id: Uuid) -> Result<Item, LedgerError> {
        self.fetch_item(id)?
            .ok_or_else(|| LedgerError::item_not_found(id))
    }

    fn list(&self) -> Result<Vec<Item>, LedgerError> {
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM inventory ORDER BY lower(item_name), item_name, created_at"
        );
        let rows = self.executor.query_all(&query, &[])?;
        rows.iter()
            .map(item_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(LedgerError::from)
    }

    fn update(&self, id: Uuid, patch: &ItemPatch) -> Result<Item, LedgerError> {
        patch.validate()?;

        let name = patch.name.as_ref().map(|n| n.trim().to_string());
        let category = patch.category.map(|c| c.as_str().to_string());
        let image_declared = patch.image_ref.is_some();
        let image_ref = patch.image_ref.clone().flatten();

        let affected = self.executor.execute(
            UPDATE_ITEM,
            &[
                &id,
                &name,
                &category,
                &patch.quantity,
                &patch.threshold,
                &patch.location,
                &patch.description,
                &patch.color_code,
                &patch.tags,
                &image_declared,
                &image_ref,
                &patch.expected_version,
            ],
        )?;

        let current = self.fetch_item(id)?;
        match (affected, current) {
            (0, None) => Err(LedgerError::item_not_found(id)),
            (0, Some(item)) => Err(LedgerError::Conflict {
                id,
                expected: patch.expected_version.unwrap_or(item.version),
                actual: item.version,
            }),
            (_, Some(item)) => Ok(item),
            (_, None) => Err(LedgerError::StorageUnavailable(format!(
                "item {id} vanished after update"
            ))),
        }
    }

    fn delete(&self, id: Uuid) -> Result<(), LedgerError> {
        let affected = self
            .executor
            .execute("DELETE FROM inventory WHERE id = $1", &[&id])?;
        if affected == 0 {
            return Err(LedgerError::item_not_found(id));
        }
        Ok(())
    }
}

impl<E: SqlExecutor> TransactionLog for PgStore<E> {
    fn append(&self, entry: NewLogEntry) -> Result<LogEntry, LedgerError> {
        let id = Uuid::new_v4();
        let action = entry.action_type.as_str();
        self.executor.execute(
            INSERT_ENTRY,
            &[
                &id,
                &entry.item_id,
                &entry.change_amount,
                &action,
                &entry.actor_id,
                &entry.actor_email,
            ],
        )?;

        let query = format!("SELECT {ENTRY_COLUMNS} FROM transaction_log WHERE id = $1");
        let rows = self.executor.query_all(&query, &[&id])?;
        let row = rows.first().ok_or_else(|| {
            LedgerError::StorageUnavailable(format!("appended entry {id} could not be read back"))
        })?;
        Ok(entry_from_row(row)?)
    }

    fn list_for_item(&self, item_id: Uuid) -> Result<Vec<LogEntry>, LedgerError> {
        let query = format!(
            "SELECT {ENTRY_COLUMNS} FROM transaction_log WHERE item_id = $1 \
             ORDER BY \"timestamp\" DESC, seq DESC"
        );
        let rows = self.executor.query_all(&query, &[&item_id])?;
        rows.iter()
            .map(entry_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(LedgerError::from)
    }

    fn list_all(&self, limit: Option<usize>) -> Result<Vec<EntryView>, LedgerError> {
        let limit = limit
            .map(|l| {
                i64::try_from(l)
                    .map_err(|_| LedgerError::Validation(format!("history limit {l} is too large")))
            })
            .transpose()?;
        let rows = self.executor.query_all(SELECT_JOINED_ENTRIES, &[&limit])?;
        rows.iter()
            .map(|row| {
                let entry = entry_from_row(row)?;
                let profile = Profile {
                    id: entry.actor_id,
                    first_name: column(row, "first_name")?,
                    last_name: column(row, "last_name")?,
                    ..Profile::default()
                };
                Ok(EntryView {
                    item_name: column(row, "item_name")?,
                    actor_name: profile.full_name(),
                    entry,
                })
            })
            .collect::<Result<Vec<_>, ExecutorError>>()
            .map_err(LedgerError::from)
    }
}

impl<E: SqlExecutor> ProfileDirectory for PgStore<E> {
    fn get_profile(&self, actor_id: Uuid) -> Result<Option<Profile>, LedgerError> {
        let rows = self.executor.query_all(
            "SELECT id, first_name, last_name, user_type, avatar_url FROM profiles WHERE id = $1",
            &[&actor_id],
        )?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        Ok(Some(Profile {
            id: column(row, "id")?,
            first_name: column(row, "first_name")?,
            last_name: column(row, "last_name")?,
            user_type: column(row, "user_type")?,
            avatar_ref: column(row, "avatar_url")?,
        }))
    }
}

fn column<'a, T: FromSql<'a>>(row: &'a Row, name: &str) -> Result<T, ExecutorError> {
    row.try_get::<_, T>(name)
        .map_err(|e| ExecutorError::decode(name, e))
}

fn item_from_row(row: &Row) -> Result<Item, ExecutorError> {
    let category: String = column(row, "category")?;
    let category = category
        .parse::<Category>()
        .map_err(|e| ExecutorError::decode("category", e))?;
    Ok(Item {
        id: column(row, "id")?,
        name: column(row, "item_name")?,
        category,
        quantity: column(row, "quantity")?,
        threshold: column(row, "threshold")?,
        location: column(row, "location")?,
        description: column(row, "description")?,
        color_code: column(row, "color_code")?,
        tags: column(row, "tags")?,
        image_ref: column(row, "image_url")?,
        version: column(row, "version")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn entry_from_row(row: &Row) -> Result<LogEntry, ExecutorError> {
    let action: String = column(row, "action_type")?;
    let action_type = action
        .parse::<ActionType>()
        .map_err(|e| ExecutorError::decode("action_type", e))?;
    Ok(LogEntry {
        id: column(row, "id")?,
        item_id: column(row, "item_id")?,
        change_amount: column(row, "change_amount")?,
        action_type,
        actor_id: column(row, "user_id")?,
        actor_email: column(row, "user_email")?,
        timestamp: column(row, "timestamp")?,
    })
}

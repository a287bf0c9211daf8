//! Table definitions for the relational backend.
//!
//! `transaction_log.item_id` has no foreign key: deleting an item
//! leaves its entries in place, and reads render them with an unresolved item.

use super::executor::{ExecutorError, SqlExecutor};
use sea_query::{
    ColumnDef, ColumnType, Expr, Index, IndexCreateStatement, PostgresQueryBuilder, Table,
    TableCreateStatement,
};

pub const INVENTORY_TABLE: &str = "inventory";
pub const TRANSACTION_LOG_TABLE: &str = "transaction_log";
pub const PROFILES_TABLE: &str = "profiles";

/// `inventory`: one row per item
pub fn inventory_table() -> TableCreateStatement {
    Table::create()
        .table(INVENTORY_TABLE)
        .if_not_exists()
        .col(ColumnDef::new("id").uuid().not_null().primary_key())
        .col(ColumnDef::new("item_name").text().not_null())
        .col(ColumnDef::new("category").text().not_null())
        .col(ColumnDef::new("quantity").big_integer().not_null())
        .col(ColumnDef::new("threshold").big_integer().not_null())
        .col(ColumnDef::new("location").text().not_null().default(""))
        .col(ColumnDef::new("description").text().not_null().default(""))
        .col(ColumnDef::new("color_code").text().not_null())
        .col(ColumnDef::new("tags").array(ColumnType::Text).not_null())
        .col(ColumnDef::new("image_url").text().null())
        .col(ColumnDef::new("version").big_integer().not_null().default(1))
        .col(ColumnDef::new("created_at").timestamp_with_time_zone().not_null())
        .col(ColumnDef::new("updated_at").timestamp_with_time_zone().not_null())
        .to_owned()
}

/// `transaction_log`: append-only; `seq` breaks timestamp ties
pub fn transaction_log_table() -> TableCreateStatement {
    Table::create()
        .table(TRANSACTION_LOG_TABLE)
        .if_not_exists()
        .col(ColumnDef::new("id").uuid().not_null().primary_key())
        .col(ColumnDef::new("seq").big_integer().not_null().auto_increment())
        .col(ColumnDef::new("item_id").uuid().not_null())
        .col(ColumnDef::new("change_amount").big_integer().not_null())
        .col(ColumnDef::new("action_type").text().not_null())
        .col(ColumnDef::new("user_id").uuid().not_null())
        .col(ColumnDef::new("user_email").text().not_null())
        .col(
            ColumnDef::new("timestamp")
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .to_owned()
}

/// `profiles`: owned by the profile service, read here for display names
pub fn profiles_table() -> TableCreateStatement {
    Table::create()
        .table(PROFILES_TABLE)
        .if_not_exists()
        .col(ColumnDef::new("id").uuid().not_null().primary_key())
        .col(ColumnDef::new("first_name").text().null())
        .col(ColumnDef::new("last_name").text().null())
        .col(ColumnDef::new("user_type").text().null())
        .col(ColumnDef::new("avatar_url").text().null())
        .to_owned()
}

pub fn transaction_log_item_index() -> IndexCreateStatement {
    Index::create()
        .if_not_exists()
        .name("idx_transaction_log_item_id")
        .table(TRANSACTION_LOG_TABLE)
        .col(Expr::col("item_id"))
        .to_owned()
}

pub fn transaction_log_timestamp_index() -> IndexCreateStatement {
    Index::create()
        .if_not_exists()
        .name("idx_transaction_log_timestamp")
        .table(TRANSACTION_LOG_TABLE)
        .col(Expr::col("timestamp"))
        .to_owned()
}

/// Render every DDL statement in creation order
pub fn schema_statements() -> Vec<String> {
    vec![
        inventory_table().build(PostgresQueryBuilder),
        transaction_log_table().build(PostgresQueryBuilder),
        profiles_table().build(PostgresQueryBuilder),
        transaction_log_item_index().build(PostgresQueryBuilder),
        transaction_log_timestamp_index().build(PostgresQueryBuilder),
    ]
}

/// Create the tables and indexes if they do not exist yet
pub fn initialize_schema(executor: &dyn SqlExecutor) -> Result<(), ExecutorError> {
    for statement in schema_statements() {
        executor.execute(&statement, &[])?;
    }
    log::info!("inventory schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_are_idempotent() {
        let statements = schema_statements();
        assert_eq!(statements.len(), 5);
        for statement in &statements {
            assert!(statement.contains("IF NOT EXISTS"), "not idempotent: {statement}");
        }
    }

    #[test]
    fn test_inventory_table_columns() {
        let sql = inventory_table().build(PostgresQueryBuilder);
        assert!(sql.contains("\"inventory\""));
        for column in ["item_name", "category", "quantity", "threshold", "tags", "image_url", "version"] {
            assert!(sql.contains(&format!("\"{column}\"")), "missing {column}: {sql}");
        }
    }

    #[test]
    fn test_transaction_log_has_no_foreign_key() {
        let sql = transaction_log_table().build(PostgresQueryBuilder);
        assert!(sql.contains("\"transaction_log\""));
        assert!(sql.contains("\"user_email\""));
        assert!(!sql.to_uppercase().contains("REFERENCES"));
    }
}

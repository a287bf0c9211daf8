//! PostgreSQL backend on `may_postgres`.

pub mod executor;
pub mod schema;
pub mod store;

pub use executor::{connect, ExecutorError, PgExecutor, SqlExecutor};
pub use schema::initialize_schema;
pub use store::PgStore;

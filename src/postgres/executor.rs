//! SQL execution over `may_postgres`.
//!
//! [`SqlExecutor`] abstracts statement execution so [`PgStore`](super::PgStore)
//! can be driven by a plain client or by any wrapper around one.

use crate::config::DatabaseConfig;
use may_postgres::types::ToSql;
use may_postgres::{Client, Error as PostgresError, Row};
use std::fmt;
use std::time::Instant;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Failure below the store: the driver, or a row the store cannot read
#[derive(Debug)]
pub enum ExecutorError {
    /// Statement rejected or connection lost
    Driver(PostgresError),
    /// A returned column did not hold what the store expects
    Decode { column: String, reason: String },
}

impl ExecutorError {
    pub fn decode(column: &str, reason: impl fmt::Display) -> Self {
        ExecutorError::Decode {
            column: column.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorError::Driver(e) => write!(f, "database driver: {e}"),
            ExecutorError::Decode { column, reason } => {
                write!(f, "cannot read column `{column}`: {reason}")
            }
        }
    }
}

impl std::error::Error for ExecutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecutorError::Driver(e) => Some(e),
            ExecutorError::Decode { .. } => None,
        }
    }
}

impl From<PostgresError> for ExecutorError {
    fn from(err: PostgresError) -> Self {
        ExecutorError::Driver(err)
    }
}

/// Trait for executing SQL statements
pub trait SqlExecutor {
    /// Execute a statement and return the number of rows affected
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, ExecutorError>;

    /// Execute a query and return every row
    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, ExecutorError>;
}

/// [`SqlExecutor`] backed by a `may_postgres::Client`
pub struct PgExecutor {
    client: Client,
}

impl PgExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the `[database]` section; call
    /// [`DatabaseConfig::validate`] first to reject unusable URLs early
    pub fn connect(config: &DatabaseConfig) -> Result<Self, ExecutorError> {
        connect(&config.url).map(Self::new)
    }

    /// `SELECT 1` round trip
    pub fn check_health(&self) -> Result<bool, ExecutorError> {
        let rows = self.query_all("SELECT 1", &[])?;
        Ok(rows.len() == 1)
    }

    fn timed<T>(
        &self,
        query: &str,
        run: impl FnOnce(&Client) -> Result<T, PostgresError>,
    ) -> Result<T, ExecutorError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::sql_span(query).entered();
        #[cfg(not(feature = "tracing"))]
        let _ = query;

        let start = Instant::now();
        let result = run(&self.client).map_err(|e| {
            #[cfg(feature = "metrics")]
            METRICS.record_storage_error();
            log::debug!("statement failed: {e}");
            ExecutorError::Driver(e)
        });

        #[cfg(feature = "metrics")]
        METRICS.record_storage_duration(start.elapsed());
        #[cfg(not(feature = "metrics"))]
        let _ = start;

        result
    }
}

impl SqlExecutor for PgExecutor {
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, ExecutorError> {
        self.timed(query, |client| client.execute(query, params))
    }

    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, ExecutorError> {
        self.timed(query, |client| client.query(query, params))
    }
}

/// Open a client connection. Blocking, but safe inside a `may` coroutine.
pub fn connect(url: &str) -> Result<Client, ExecutorError> {
    let client = may_postgres::connect(url)?;
    log::info!("connected to inventory database");
    Ok(client)
}

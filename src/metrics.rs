//! Ledger observability.
//!
//! With the `metrics` feature, [`METRICS`] records OpenTelemetry instruments
//! through the global meter provider (a no-op until the host installs one).
//! With the `tracing` feature, [`tracing_helpers`] builds the spans the ledger
//! and the SQL executor run inside.

#[cfg(feature = "metrics")]
pub use otel::{LedgerMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use crate::model::ActionType;
    use once_cell::sync::Lazy;
    use opentelemetry::{
        global,
        metrics::{Counter, Histogram},
        KeyValue,
    };
    use std::time::Duration;

    pub static METRICS: Lazy<LedgerMetrics> = Lazy::new(LedgerMetrics::init);

    pub struct LedgerMetrics {
        pub mutations_total: Counter<u64>,
        pub log_entries_total: Counter<u64>,
        pub partial_commits_total: Counter<u64>,
        pub storage_errors_total: Counter<u64>,
        pub storage_duration: Histogram<f64>,
    }

    impl LedgerMetrics {
        pub fn init() -> Self {
            let meter = global::meter("stockroom");

            let mutations_total = meter
                .u64_counter("stockroom_mutations_total")
                .with_description("Committed ledger mutations by operation")
                .build();

            let log_entries_total = meter
                .u64_counter("stockroom_log_entries_total")
                .with_description("Transaction log entries written by action type")
                .build();

            let partial_commits_total = meter
                .u64_counter("stockroom_partial_commits_total")
                .with_description("Item writes whose paired log append failed")
                .build();

            let storage_errors_total = meter
                .u64_counter("stockroom_storage_errors_total")
                .with_description("Failed SQL statements")
                .build();

            let storage_duration = meter
                .f64_histogram("stockroom_storage_duration_seconds")
                .with_description("Duration of SQL statements")
                .build();

            Self {
                mutations_total,
                log_entries_total,
                partial_commits_total,
                storage_errors_total,
                storage_duration,
            }
        }

        pub fn record_mutation(&self, operation: &'static str) {
            self.mutations_total
                .add(1, &[KeyValue::new("operation", operation)]);
        }

        pub fn record_log_entry(&self, action: ActionType) {
            self.log_entries_total
                .add(1, &[KeyValue::new("action", action.as_str())]);
        }

        pub fn record_partial_commit(&self, operation: &'static str) {
            self.partial_commits_total
                .add(1, &[KeyValue::new("operation", operation)]);
        }

        pub fn record_storage_error(&self) {
            self.storage_errors_total.add(1, &[]);
        }

        pub fn record_storage_duration(&self, elapsed: Duration) {
            self.storage_duration.record(elapsed.as_secs_f64(), &[]);
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;
    use uuid::Uuid;

    /// Span around one coordinator operation
    pub fn ledger_span(operation: &'static str, item_id: Option<Uuid>) -> Span {
        match item_id {
            Some(id) => tracing::info_span!("stockroom.ledger", operation, item_id = %id),
            None => tracing::info_span!("stockroom.ledger", operation),
        }
    }

    /// Span around one SQL statement; only the leading keyword is recorded
    pub fn sql_span(query: &str) -> Span {
        let statement = query
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();
        tracing::debug_span!("stockroom.sql", statement = %statement)
    }
}

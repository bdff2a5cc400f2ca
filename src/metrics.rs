//! Migration and query metrics on the `opentelemetry` global meter.
//!
//! Nothing is exported from here; an application that wants the numbers installs a
//! meter provider before running migrations.

use once_cell::sync::Lazy;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
    KeyValue,
};
use std::time::Duration;

pub static METRICS: Lazy<MonarchMetrics> = Lazy::new(MonarchMetrics::init);

pub struct MonarchMetrics {
    pub migrations_applied: Counter<u64>,
    pub migrations_failed: Counter<u64>,
    pub migrations_skipped: Counter<u64>,
    pub migration_duration: Histogram<f64>,
    pub queries_total: Counter<u64>,
    pub query_duration: Histogram<f64>,
}

impl MonarchMetrics {
    pub fn init() -> Self {
        let meter = global::meter("monarch");

        let migrations_applied = meter.u64_counter("monarch_migrations_applied_total")
            .with_description("Migrations whose logic completed and whose record was written").build();

        let migrations_failed = meter.u64_counter("monarch_migrations_failed_total")
            .with_description("Migrations that halted a run").build();

        let migrations_skipped = meter.u64_counter("monarch_migrations_skipped_total")
            .with_description("Migrations skipped because an execution record exists").build();

        let migration_duration = meter.f64_histogram("monarch_migration_duration_seconds")
            .with_description("Duration of migration logic").build();

        let queries_total = meter.u64_counter("monarch_queries_total")
            .with_description("Total statements executed").build();

        let query_duration = meter.f64_histogram("monarch_query_duration_seconds")
            .with_description("Duration of statements").build();

        Self {
            migrations_applied,
            migrations_failed,
            migrations_skipped,
            migration_duration,
            queries_total,
            query_duration,
        }
    }

    pub fn record_applied(&self, identity: &str, elapsed: Duration) {
        let attributes = [KeyValue::new("migration", identity.to_string())];
        self.migrations_applied.add(1, &attributes);
        self.migration_duration.record(elapsed.as_secs_f64(), &attributes);
    }

    pub fn record_failed(&self, identity: &str) {
        self.migrations_failed.add(1, &[KeyValue::new("migration", identity.to_string())]);
    }

    pub fn record_skipped(&self) {
        self.migrations_skipped.add(1, &[]);
    }

    pub fn record_query(&self, elapsed: Duration) {
        self.queries_total.add(1, &[]);
        self.query_duration.record(elapsed.as_secs_f64(), &[]);
    }
}

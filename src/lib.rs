//! # Monarch
//!
//! Timestamp-ordered, run-once migrations for PostgreSQL on the `may` runtime.
//!
//! Migrations are discovered from a directory, resolved against a
//! [`MigrationRegistry`](migration::MigrationRegistry), sorted by identity and applied
//! one at a time. Each success is recorded so that it never runs again; the first
//! failure stops the run.

pub mod config;
pub mod connection;
pub mod executor;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod migration;

pub use config::{DatastoreKind, MonarchConfig};
pub use connection::{connect, validate_connection_string, ConnectionError};
pub use executor::{DbError, DbExecutor, MayPostgresExecutor};

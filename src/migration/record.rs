//! `ExecutionRecord` - durable proof that a migration identity has been applied

use crate::migration::store::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the `monarch_migrations` table (or one entry of the JSON ledger)
///
/// Records are only ever inserted. Nothing in this crate updates or deletes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Identity of the applied migration
    pub migration_identity: String,

    /// When the migration's logic completed
    pub executed_at: DateTime<Utc>,
}

impl ExecutionRecord {
    #[must_use]
    pub fn new(migration_identity: impl Into<String>, executed_at: DateTime<Utc>) -> Self {
        Self {
            migration_identity: migration_identity.into(),
            executed_at,
        }
    }

    /// Create an `ExecutionRecord` from a database row
    ///
    /// Expected column order: `migration_identity`, `executed_at`
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` if a column is missing or has an unexpected type,
    /// e.g. `executed_at` declared as `TIMESTAMP` rather than `TIMESTAMPTZ`.
    pub fn from_row(row: &may_postgres::Row) -> Result<Self, StoreError> {
        let migration_identity: String = row
            .try_get(0)
            .map_err(|e| StoreError::Corrupt(format!("migration_identity: {e}")))?;
        let executed_at: DateTime<Utc> = row
            .try_get(1)
            .map_err(|e| StoreError::Corrupt(format!("executed_at for '{migration_identity}': {e}")))?;

        Ok(Self {
            migration_identity,
            executed_at,
        })
    }
}

//! Execution record stores
//!
//! An [`ExecutionStore`] answers one question ("has this identity run?") and accepts one
//! write ("this identity just ran"). History is append-only: there is no update or
//! delete. Implementations:
//!
//! - [`PostgresStore`](crate::migration::PostgresStore): the `monarch_migrations` table
//! - [`JsonFileStore`](crate::migration::JsonFileStore): a JSON ledger on disk
//! - [`InMemoryStore`]: process-local, for tests and embedding

use crate::DbError;
use crate::migration::ExecutionRecord;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

/// Errors raised by an execution store
#[derive(Debug)]
pub enum StoreError {
    /// Database unreachable or statement failed
    Database(DbError),
    /// Ledger file could not be read or written
    Io(std::io::Error),
    /// Stored data could not be decoded
    Corrupt(String),
    /// A record for this identity already exists
    DuplicateRecord(String),
    /// Table name is not a plain SQL identifier
    InvalidTableName(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "{e}"),
            StoreError::Io(e) => write!(f, "ledger I/O error: {e}"),
            StoreError::Corrupt(msg) => write!(f, "execution records are corrupt: {msg}"),
            StoreError::DuplicateRecord(identity) => {
                write!(f, "an execution record for '{identity}' already exists")
            }
            StoreError::InvalidTableName(name) => {
                write!(f, "'{name}' is not a valid table name")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) => Some(e),
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(error: DbError) -> Self {
        StoreError::Database(error)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        StoreError::Io(error)
    }
}

/// Persistent record of which migration identities have completed
pub trait ExecutionStore {
    /// Whether a record exists for `identity`
    ///
    /// Must reflect every earlier successful `record_success` call.
    fn has_run(&self, identity: &str) -> Result<bool, StoreError>;

    /// Insert the record for `identity`
    ///
    /// Fails with `StoreError::DuplicateRecord` if one already exists.
    fn record_success(&self, identity: &str, executed_at: DateTime<Utc>) -> Result<(), StoreError>;

    /// All records, ascending by identity
    fn records(&self) -> Result<Vec<ExecutionRecord>, StoreError>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<BTreeMap<String, DateTime<Utc>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, DateTime<Utc>>>, StoreError> {
        self.records
            .lock()
            .map_err(|e| StoreError::Corrupt(format!("in-memory store lock poisoned: {e}")))
    }
}

impl ExecutionStore for InMemoryStore {
    fn has_run(&self, identity: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.contains_key(identity))
    }

    fn record_success(&self, identity: &str, executed_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut records = self.lock()?;
        if records.contains_key(identity) {
            return Err(StoreError::DuplicateRecord(identity.to_string()));
        }
        records.insert(identity.to_string(), executed_at);
        Ok(())
    }

    fn records(&self) -> Result<Vec<ExecutionRecord>, StoreError> {
        Ok(self
            .lock()?
            .iter()
            .map(|(identity, executed_at)| ExecutionRecord::new(identity.clone(), *executed_at))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_store_records_once() {
        let store = InMemoryStore::new();
        assert!(!store.has_run("_202401201200_a_migration").unwrap());

        store.record_success("_202401201200_a_migration", Utc::now()).unwrap();
        assert!(store.has_run("_202401201200_a_migration").unwrap());

        let err = store
            .record_success("_202401201200_a_migration", Utc::now())
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateRecord(ref id) if id == "_202401201200_a_migration"));
        assert_eq!(store.records().unwrap().len(), 1);
    }

    #[test]
    fn test_in_memory_store_records_sorted() {
        let store = InMemoryStore::new();
        store.record_success("_202402010000_b_migration", Utc::now()).unwrap();
        store.record_success("_202401010000_a_migration", Utc::now()).unwrap();

        let identities: Vec<String> = store
            .records()
            .unwrap()
            .into_iter()
            .map(|r| r.migration_identity)
            .collect();
        assert_eq!(
            identities,
            vec!["_202401010000_a_migration", "_202402010000_b_migration"]
        );
    }
}

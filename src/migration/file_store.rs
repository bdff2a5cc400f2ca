//! JSON ledger on disk, for targets without a PostgreSQL state table

use crate::migration::{ExecutionRecord, ExecutionStore, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Ledger {
    records: Vec<ExecutionRecord>,
}

/// Execution store kept in a JSON file
///
/// The file is read on every call, so a record written by `record_success` is visible to
/// the next `has_run`. Writes go to a sibling temp file that is then renamed over the
/// ledger, so an interrupted write leaves the previous ledger intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Ledger, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Ledger::default()),
            Err(e) => return Err(StoreError::Io(e)),
        };
        if content.trim().is_empty() {
            return Ok(Ledger::default());
        }
        serde_json::from_str(&content)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", self.path.display())))
    }

    fn write(&self, ledger: &Ledger) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(ledger)
            .map_err(|e| StoreError::Corrupt(format!("cannot encode ledger: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ExecutionStore for JsonFileStore {
    fn has_run(&self, identity: &str) -> Result<bool, StoreError> {
        Ok(self
            .read()?
            .records
            .iter()
            .any(|r| r.migration_identity == identity))
    }

    fn record_success(&self, identity: &str, executed_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut ledger = self.read()?;
        if ledger.records.iter().any(|r| r.migration_identity == identity) {
            return Err(StoreError::DuplicateRecord(identity.to_string()));
        }
        ledger.records.push(ExecutionRecord::new(identity, executed_at));
        ledger
            .records
            .sort_by(|a, b| a.migration_identity.cmp(&b.migration_identity));
        self.write(&ledger)
    }

    fn records(&self) -> Result<Vec<ExecutionRecord>, StoreError> {
        let mut records = self.read()?.records;
        records.sort_by(|a, b| a.migration_identity.cmp(&b.migration_identity));
        Ok(records)
    }
}

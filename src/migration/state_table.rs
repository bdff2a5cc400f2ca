//! PostgreSQL execution ledger (`monarch_migrations`)

use crate::DbExecutor;
use crate::migration::{ExecutionRecord, ExecutionStore, StoreError};
use chrono::{DateTime, Utc};
use regex::Regex;
use sea_query::{Alias, ColumnDef, PostgresQueryBuilder, Table, TableCreateStatement};

/// Default state table name
pub const STATE_TABLE: &str = "monarch_migrations";

/// Build the `CREATE TABLE IF NOT EXISTS` statement for the ledger
///
/// One row per applied migration; the primary key on `migration_identity` is what
/// guarantees a migration is never recorded twice.
pub fn create_state_table(table: &str) -> TableCreateStatement {
    Table::create()
        .table(Alias::new(table.to_string()))
        .if_not_exists()
        .col(
            ColumnDef::new(Alias::new("migration_identity"))
                .string()
                .string_len(255)
                .not_null()
                .primary_key(),
        )
        .col(
            ColumnDef::new(Alias::new("executed_at"))
                .timestamp_with_time_zone()
                .not_null(),
        )
        .to_owned()
}

/// Execution store backed by a PostgreSQL table
pub struct PostgresStore<'a> {
    executor: &'a dyn DbExecutor,
    table: String,
}

impl<'a> PostgresStore<'a> {
    /// Store using the default `monarch_migrations` table
    pub fn new(executor: &'a dyn DbExecutor) -> Self {
        Self {
            executor,
            table: STATE_TABLE.to_string(),
        }
    }

    /// Store using a custom table name
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidTableName` unless `table` is a lowercase SQL identifier.
    pub fn with_table(executor: &'a dyn DbExecutor, table: &str) -> Result<Self, StoreError> {
        // Interpolated into SQL below, so only plain identifiers are accepted
        let re = Regex::new(r"^[a-z_][a-z0-9_]{0,62}$")
            .map_err(|e| StoreError::InvalidTableName(format!("{table} ({e})")))?;
        if !re.is_match(table) {
            return Err(StoreError::InvalidTableName(table.to_string()));
        }
        Ok(Self {
            executor,
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the state table if it does not exist
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the DDL fails.
    pub fn initialize(&self) -> Result<(), StoreError> {
        let sql = create_state_table(&self.table).build(PostgresQueryBuilder);
        self.executor.execute(&sql, &[])?;
        log::debug!("state table {} ready", self.table);
        Ok(())
    }
}

impl ExecutionStore for PostgresStore<'_> {
    fn has_run(&self, identity: &str) -> Result<bool, StoreError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE migration_identity = $1",
            self.table
        );
        let identity = identity.to_string();
        let row = self.executor.query_one(&sql, &[&identity])?;
        let count: i64 = row
            .try_get(0)
            .map_err(|e| StoreError::Corrupt(format!("record count for '{identity}': {e}")))?;
        Ok(count > 0)
    }

    fn record_success(&self, identity: &str, executed_at: DateTime<Utc>) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {} (migration_identity, executed_at) VALUES ($1, $2) \
             ON CONFLICT (migration_identity) DO NOTHING",
            self.table
        );
        let identity_param = identity.to_string();
        let inserted = self.executor.execute(&sql, &[&identity_param, &executed_at])?;
        if inserted == 0 {
            return Err(StoreError::DuplicateRecord(identity.to_string()));
        }
        Ok(())
    }

    fn records(&self) -> Result<Vec<ExecutionRecord>, StoreError> {
        let sql = format!(
            "SELECT migration_identity, executed_at FROM {} ORDER BY migration_identity ASC",
            self.table
        );
        let rows = self.executor.query_all(&sql, &[])?;
        rows.iter().map(ExecutionRecord::from_row).collect()
    }
}

//! Migration trait definition and the unit the runner executes

use crate::{DbError, DbExecutor};
use may_postgres::types::ToSql;
use std::fmt;

/// Trait that all migrations must implement
///
/// Each migration file defines one type whose name ends in `Migration` and implements
/// this trait. `run` is called at most once per target datastore; returning an error
/// halts the run and leaves the migration pending for the next one.
///
/// There is no `down()`. Undoing partial effects after a failure is up to the
/// migration itself, so logic that can fail halfway should be idempotent or wrap its
/// statements in a transaction.
pub trait Migration: Send + Sync {
    /// Apply the migration
    fn run(&self, ctx: &MigrationContext<'_>) -> Result<(), DbError>;
}

/// What a migration gets to work with while it runs
pub struct MigrationContext<'a> {
    identity: &'a str,
    executor: Option<&'a dyn DbExecutor>,
}

impl<'a> MigrationContext<'a> {
    pub fn new(identity: &'a str, executor: Option<&'a dyn DbExecutor>) -> Self {
        Self { identity, executor }
    }

    /// Identity of the running migration
    pub fn identity(&self) -> &str {
        self.identity
    }

    /// The database connection configured for this run
    ///
    /// # Errors
    ///
    /// Returns `DbError::Other` when the runner was started without a database.
    pub fn executor(&self) -> Result<&'a dyn DbExecutor, DbError> {
        self.executor.ok_or_else(|| {
            DbError::Other(format!(
                "migration '{}' needs a database connection but none is configured",
                self.identity
            ))
        })
    }

    /// Shorthand for `self.executor()?.execute(..)`
    ///
    /// # Errors
    ///
    /// Returns `DbError` if no connection is configured or the statement fails.
    pub fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> Result<u64, DbError> {
        self.executor()?.execute(sql, params)
    }
}

/// Anything keyed by a migration identity
pub trait Identified {
    fn identity(&self) -> &str;
}

/// A loaded migration: its identity plus the logic to run
///
/// Built at discovery time and dropped when the run is over.
pub struct MigrationUnit {
    identity: String,
    logic: Box<dyn Migration>,
}

impl MigrationUnit {
    pub fn new(identity: impl Into<String>, logic: Box<dyn Migration>) -> Self {
        Self {
            identity: identity.into(),
            logic,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Run the unit's logic once
    ///
    /// # Errors
    ///
    /// Whatever the migration logic returns.
    pub fn run(&self, ctx: &MigrationContext<'_>) -> Result<(), DbError> {
        self.logic.run(ctx)
    }
}

impl Identified for MigrationUnit {
    fn identity(&self) -> &str {
        &self.identity
    }
}

impl fmt::Debug for MigrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationUnit")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

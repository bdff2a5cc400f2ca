//! Migrator - directory → discover → order → status / migrate

use crate::migration::file::{discover_migrations, MigrationFile};
use crate::migration::{
    order, ExecutionStore, MigrationError, MigrationRegistry, MigrationStatus, MigrationUnit,
    Ordered, RunReport, Runner,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Migration pipeline for one source directory
///
/// Every call re-reads the directory; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct Migrator {
    migrations_dir: PathBuf,
}

impl Migrator {
    /// Create a new Migrator with the specified migrations directory
    pub fn new(migrations_dir: impl AsRef<Path>) -> Self {
        Self {
            migrations_dir: migrations_dir.as_ref().to_path_buf(),
        }
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// Discover and order every artifact in the directory
    ///
    /// # Errors
    ///
    /// Returns a discovery error if any artifact is malformed or two share an identity.
    pub fn discover(&self) -> Result<Ordered<MigrationFile>, MigrationError> {
        let discovered = discover_migrations(&self.migrations_dir)?;
        Ok(order(discovered))
    }

    /// Discover, then resolve every artifact against `registry`
    ///
    /// All-or-nothing: one unresolvable artifact fails the whole load.
    ///
    /// # Errors
    ///
    /// Discovery errors, `NotRegistered`, or `TypeMismatch`.
    pub fn load(&self, registry: &MigrationRegistry) -> Result<Ordered<MigrationUnit>, MigrationError> {
        let discovered = discover_migrations(&self.migrations_dir)?;
        let units: HashMap<String, MigrationUnit> = discovered
            .into_iter()
            .map(|(identity, file)| Ok((identity, resolve(&file, registry)?)))
            .collect::<Result<_, MigrationError>>()?;
        Ok(order(units))
    }

    /// Applied vs pending for the artifacts currently on disk
    ///
    /// # Errors
    ///
    /// Discovery errors, or `Persistence` if the store cannot be queried.
    pub fn status(&self, store: &dyn ExecutionStore) -> Result<MigrationStatus, MigrationError> {
        MigrationStatus::compute(&self.discover()?, store)
    }

    /// Pending artifacts in execution order
    ///
    /// # Errors
    ///
    /// Same as [`Migrator::status`].
    pub fn pending(&self, store: &dyn ExecutionStore) -> Result<Ordered<MigrationFile>, MigrationError> {
        let discovered = self.discover()?;
        let status = MigrationStatus::compute(&discovered, store)?;
        let pending: HashSet<&str> = status.pending.iter().map(String::as_str).collect();
        Ok(discovered.filter(|file| pending.contains(file.identity.as_str())))
    }

    /// Load everything and hand it to `runner`
    ///
    /// A discovery or load error is returned before any migration runs. Otherwise the
    /// runner's report is returned as is, failed or not.
    ///
    /// # Errors
    ///
    /// Same as [`Migrator::load`].
    pub fn migrate(
        &self,
        registry: &MigrationRegistry,
        runner: &mut Runner<'_>,
    ) -> Result<RunReport, MigrationError> {
        let units = self.load(registry)?;
        if units.is_empty() {
            log::info!("no migrations in {}", self.migrations_dir.display());
        }
        Ok(runner.run(&units))
    }
}

fn resolve(file: &MigrationFile, registry: &MigrationRegistry) -> Result<MigrationUnit, MigrationError> {
    if let Some(registered) = registry.type_name(&file.identity) {
        if registered != file.type_name {
            return Err(MigrationError::TypeMismatch {
                identity: file.identity.clone(),
                registered: registered.to_string(),
                discovered: file.type_name.clone(),
            });
        }
    }

    let logic = registry
        .instantiate(&file.identity)
        .ok_or_else(|| MigrationError::NotRegistered {
            identity: file.identity.clone(),
            path: file.path.clone(),
        })?;

    Ok(MigrationUnit::new(file.identity.clone(), logic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::{ExecutionRecord, InMemoryStore, StoreError};
    use chrono::{DateTime, Utc};
    use std::cell::Cell;
    use std::fs;
    use tempfile::TempDir;

    /// Counts `has_run` lookups on top of an in-memory ledger
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryStore,
        lookups: Cell<usize>,
    }

    impl ExecutionStore for CountingStore {
        fn has_run(&self, identity: &str) -> Result<bool, StoreError> {
            self.lookups.set(self.lookups.get() + 1);
            self.inner.has_run(identity)
        }

        fn record_success(&self, identity: &str, executed_at: DateTime<Utc>) -> Result<(), StoreError> {
            self.inner.record_success(identity, executed_at)
        }

        fn records(&self) -> Result<Vec<ExecutionRecord>, StoreError> {
            self.inner.records()
        }
    }

    fn write_artifact(dir: &Path, identity: &str, type_name: &str) {
        let source = format!(
            "pub struct {type_name};\n\
             impl Migration for {type_name} {{\n\
                 fn run(&self, _ctx: &MigrationContext<'_>) -> Result<(), DbError> {{ Ok(()) }}\n\
             }}\n"
        );
        fs::write(dir.join(format!("{identity}.rs")), source).unwrap();
    }

    #[test]
    fn test_pending_queries_each_identity_once() {
        let temp_dir = TempDir::new().unwrap();
        write_artifact(temp_dir.path(), "_202402010000_add_indexes_migration", "AddIndexesMigration");
        write_artifact(temp_dir.path(), "_202401010000_create_users_migration", "CreateUsersMigration");
        write_artifact(temp_dir.path(), "_202403010000_backfill_emails_migration", "BackfillEmailsMigration");

        let store = CountingStore::default();
        store
            .inner
            .record_success("_202402010000_add_indexes_migration", Utc::now())
            .unwrap();

        let pending = Migrator::new(temp_dir.path()).pending(&store).unwrap();

        assert_eq!(
            pending.identities(),
            vec![
                "_202401010000_create_users_migration",
                "_202403010000_backfill_emails_migration",
            ]
        );
        assert_eq!(store.lookups.get(), 3);
    }
}

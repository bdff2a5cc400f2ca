//! Migration registry: maps identities to constructible migration logic
//!
//! The registry is an ordinary value. A runner binary builds one at startup, usually
//! from the manifest `monarch_migrate::build_script` writes into `OUT_DIR`:
//!
//! ```rust,ignore
//! include!(concat!(env!("OUT_DIR"), "/migration_manifest.rs"));
//!
//! let registry = registry()?;
//! ```
//!
//! or by hand:
//!
//! ```rust,ignore
//! let mut registry = MigrationRegistry::new();
//! registry.register::<AddIndexesMigration>("_202401201200_add_indexes_migration")?;
//! ```

use crate::migration::{Migration, MigrationError};
use std::collections::HashMap;
use std::fmt;

type Factory = Box<dyn Fn() -> Box<dyn Migration> + Send + Sync>;

struct Registration {
    /// Short type name, when registered through `register::<M>()`
    type_name: Option<String>,
    factory: Factory,
}

/// Identity → migration factory table
#[derive(Default)]
pub struct MigrationRegistry {
    entries: HashMap<String, Registration>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration type under `identity`
    ///
    /// The type's short name is kept so that loading can check it against the type
    /// defined in the artifact.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::AlreadyRegistered` if `identity` is taken.
    pub fn register<M>(&mut self, identity: &str) -> Result<(), MigrationError>
    where
        M: Migration + Default + 'static,
    {
        self.insert(
            identity,
            Registration {
                type_name: Some(short_type_name::<M>()),
                factory: Box::new(|| -> Box<dyn Migration> { Box::new(M::default()) }),
            },
        )
    }

    /// Register a custom constructor under `identity`
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::AlreadyRegistered` if `identity` is taken.
    pub fn register_with<F>(&mut self, identity: &str, factory: F) -> Result<(), MigrationError>
    where
        F: Fn() -> Box<dyn Migration> + Send + Sync + 'static,
    {
        self.insert(
            identity,
            Registration {
                type_name: None,
                factory: Box::new(factory),
            },
        )
    }

    fn insert(&mut self, identity: &str, registration: Registration) -> Result<(), MigrationError> {
        if self.entries.contains_key(identity) {
            return Err(MigrationError::AlreadyRegistered {
                identity: identity.to_string(),
            });
        }
        self.entries.insert(identity.to_string(), registration);
        Ok(())
    }

    /// Check if a migration is registered
    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    /// Type name recorded for `identity`, if it was registered by type
    pub fn type_name(&self, identity: &str) -> Option<&str> {
        self.entries
            .get(identity)
            .and_then(|r| r.type_name.as_deref())
    }

    /// Build a fresh instance of the migration registered under `identity`
    pub fn instantiate(&self, identity: &str) -> Option<Box<dyn Migration>> {
        self.entries.get(identity).map(|r| (r.factory)())
    }

    /// All registered identities, sorted
    pub fn identities(&self) -> Vec<&str> {
        let mut identities: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        identities.sort_unstable();
        identities
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("identities", &self.identities())
            .finish()
    }
}

/// `my_crate::migrations::AddIndexesMigration` → `AddIndexesMigration`
fn short_type_name<M>() -> String {
    let full = std::any::type_name::<M>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::MigrationContext;
    use crate::DbError;

    #[derive(Default)]
    struct CreateUsersMigration;

    impl Migration for CreateUsersMigration {
        fn run(&self, _ctx: &MigrationContext<'_>) -> Result<(), DbError> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_instantiate() {
        let mut registry = MigrationRegistry::new();
        registry
            .register::<CreateUsersMigration>("_202401201200_create_users_migration")
            .unwrap();

        assert!(registry.contains("_202401201200_create_users_migration"));
        assert_eq!(
            registry.type_name("_202401201200_create_users_migration"),
            Some("CreateUsersMigration")
        );

        let logic = registry.instantiate("_202401201200_create_users_migration").unwrap();
        let ctx = MigrationContext::new("_202401201200_create_users_migration", None);
        assert!(logic.run(&ctx).is_ok());
        assert!(registry.instantiate("_202401201300_missing_migration").is_none());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = MigrationRegistry::new();
        registry
            .register::<CreateUsersMigration>("_202401201200_create_users_migration")
            .unwrap();

        let err = registry
            .register_with("_202401201200_create_users_migration", || Box::new(CreateUsersMigration))
            .unwrap_err();
        assert!(matches!(err, MigrationError::AlreadyRegistered { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_identities_sorted() {
        let mut registry = MigrationRegistry::new();
        registry.register_with("_202402010000_b_migration", || Box::new(CreateUsersMigration)).unwrap();
        registry.register_with("_202401010000_a_migration", || Box::new(CreateUsersMigration)).unwrap();

        assert_eq!(
            registry.identities(),
            vec!["_202401010000_a_migration", "_202402010000_b_migration"]
        );
        assert_eq!(registry.type_name("_202401010000_a_migration"), None);
    }
}

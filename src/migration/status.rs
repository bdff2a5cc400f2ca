//! Migration status tracking

use crate::migration::{ExecutionStore, Identified, MigrationError, Ordered};

/// Applied and pending identities for one migration source set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Identities with an execution record, in execution order
    pub applied: Vec<String>,

    /// Identities without one, in execution order
    pub pending: Vec<String>,
}

impl MigrationStatus {
    /// Split an ordered set by asking `store` about each identity
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Persistence` if the store cannot be queried.
    pub fn compute<T: Identified>(
        ordered: &Ordered<T>,
        store: &dyn ExecutionStore,
    ) -> Result<Self, MigrationError> {
        let mut status = Self::default();
        for item in ordered {
            let identity = item.identity();
            let has_run = store.has_run(identity).map_err(|error| MigrationError::Persistence {
                identity: identity.to_string(),
                error,
            })?;
            if has_run {
                status.applied.push(identity.to_string());
            } else {
                status.pending.push(identity.to_string());
            }
        }
        Ok(status)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.applied.len() + self.pending.len()
    }

    /// Check if all migrations are applied
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }

    /// The next migration a run would execute
    #[must_use]
    pub fn next_pending(&self) -> Option<&str> {
        self.pending.first().map(String::as_str)
    }
}

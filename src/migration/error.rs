//! Migration-specific error types

use crate::DbError;
use crate::migration::store::StoreError;
use std::path::PathBuf;

/// Migration-specific errors
///
/// Discovery variants abort a command before anything runs. `ExecutionFailed` and
/// `Persistence` halt the current run at the named migration.
#[derive(Debug)]
pub enum MigrationError {
    /// Migration directory exists but cannot be read
    FileNotFound(String),
    /// Artifact name or location does not follow the naming convention
    InvalidFormat(String),
    /// Artifact is not valid Rust source
    Syntax { path: PathBuf, error: String },
    /// Artifact defines no `...Migration` type
    NoMigrationType { path: PathBuf },
    /// Artifact defines more than one `...Migration` type
    AmbiguousMigrationType { path: PathBuf, candidates: Vec<String> },
    /// Migration type has no `impl Migration` block in its artifact
    MissingCapability { path: PathBuf, type_name: String },
    /// Two artifacts resolve to the same identity
    DuplicateIdentity { identity: String, first: PathBuf, second: PathBuf },
    /// Artifact has no registration in the runner's registry
    NotRegistered { identity: String, path: PathBuf },
    /// Registered type does not match the type defined in the artifact
    TypeMismatch { identity: String, registered: String, discovered: String },
    /// Identity registered twice
    AlreadyRegistered { identity: String },
    /// Migration name cannot produce a valid artifact
    InvalidName(String),
    /// Migration directory or artifact could not be created
    Directory { path: PathBuf, source: std::io::Error },
    /// Migration logic failed
    ExecutionFailed { identity: String, error: DbError },
    /// Execution record could not be read or written
    Persistence { identity: String, error: StoreError },
}

impl MigrationError {
    /// Identity of the migration this error belongs to, if any
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        match self {
            MigrationError::DuplicateIdentity { identity, .. }
            | MigrationError::NotRegistered { identity, .. }
            | MigrationError::TypeMismatch { identity, .. }
            | MigrationError::AlreadyRegistered { identity }
            | MigrationError::ExecutionFailed { identity, .. }
            | MigrationError::Persistence { identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// Whether this error was raised while discovering or loading artifacts
    #[must_use]
    pub fn is_discovery_error(&self) -> bool {
        matches!(
            self,
            MigrationError::FileNotFound(_)
                | MigrationError::InvalidFormat(_)
                | MigrationError::Syntax { .. }
                | MigrationError::NoMigrationType { .. }
                | MigrationError::AmbiguousMigrationType { .. }
                | MigrationError::MissingCapability { .. }
                | MigrationError::DuplicateIdentity { .. }
                | MigrationError::NotRegistered { .. }
                | MigrationError::TypeMismatch { .. }
        )
    }
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationError::FileNotFound(path) => write!(f, "Migration directory unreadable: {}", path),
            MigrationError::InvalidFormat(msg) => write!(f, "Invalid migration format: {}", msg),
            MigrationError::Syntax { path, error } => {
                write!(f, "Migration file {} is not valid Rust: {}", path.display(), error)
            }
            MigrationError::NoMigrationType { path } => {
                write!(
                    f,
                    "Migration file {} defines no type ending in 'Migration'",
                    path.display()
                )
            }
            MigrationError::AmbiguousMigrationType { path, candidates } => {
                write!(
                    f,
                    "Migration file {} defines more than one migration type: {}",
                    path.display(),
                    candidates.join(", ")
                )
            }
            MigrationError::MissingCapability { path, type_name } => {
                write!(
                    f,
                    "Migration type '{}' in {} does not implement Migration",
                    type_name,
                    path.display()
                )
            }
            MigrationError::DuplicateIdentity { identity, first, second } => {
                write!(
                    f,
                    "Migration identity '{}' is defined twice:\n  {}\n  {}",
                    identity,
                    first.display(),
                    second.display()
                )
            }
            MigrationError::NotRegistered { identity, path } => {
                write!(
                    f,
                    "Migration '{}' ({}) is not registered with this runner.\n\
                     Suggestion: regenerate the migration manifest and rebuild the runner binary",
                    identity,
                    path.display()
                )
            }
            MigrationError::TypeMismatch { identity, registered, discovered } => {
                write!(
                    f,
                    "Migration '{}' is registered as '{}' but its file defines '{}'",
                    identity, registered, discovered
                )
            }
            MigrationError::AlreadyRegistered { identity } => {
                write!(f, "Migration '{}' is already registered", identity)
            }
            MigrationError::InvalidName(name) => {
                write!(f, "Invalid migration name: '{}'", name)
            }
            MigrationError::Directory { path, source } => {
                write!(f, "Failed to create {}: {}", path.display(), source)
            }
            MigrationError::ExecutionFailed { identity, error } => {
                write!(f, "Migration '{}' failed during execution: {}", identity, error)
            }
            MigrationError::Persistence { identity, error } => {
                write!(
                    f,
                    "Could not track execution of migration '{}': {}",
                    identity, error
                )
            }
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MigrationError::Directory { source, .. } => Some(source),
            MigrationError::ExecutionFailed { error, .. } => Some(error),
            MigrationError::Persistence { error, .. } => Some(error),
            _ => None,
        }
    }
}

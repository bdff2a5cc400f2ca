//! Migration file discovery and parsing
//!
//! A migration artifact is a Rust source file named `_{YYYYMMDDHHMM}_{name}_migration.rs`.
//! Its identity is the file stem. The file must define exactly one type whose name ends
//! in `Migration` together with an `impl Migration for` that type.

use crate::migration::{Identified, MigrationError};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// File name suffix that marks a migration artifact
pub const MIGRATION_SUFFIX: &str = "_migration.rs";

/// Type names that end in `Migration` but are never the migration itself
pub const BASE_TYPE_NAMES: &[&str] = &["Migration", "BaseMigration"];

const FILENAME_PATTERN: &str = r"^(_(\d{12})_(.+)_migration)\.rs$";

/// Represents a discovered migration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// Path to the migration file
    pub path: PathBuf,

    /// File stem, e.g. `_202401201200_add_indexes_migration`
    pub identity: String,

    /// UTC creation minute, `YYYYMMDDHHMM`
    pub timestamp: String,

    /// Human-readable migration name
    pub name: String,

    /// The migration type defined in the file
    pub type_name: String,
}

impl MigrationFile {
    /// Parse a migration file name into `(identity, timestamp, name)`
    ///
    /// # Example
    /// - `_202401201200_add_indexes_migration.rs` → identity: `_202401201200_add_indexes_migration`,
    ///   timestamp: `202401201200`, name: `add_indexes`
    pub fn parse_filename(filename: &str) -> Result<(String, String, String), MigrationError> {
        let re = Regex::new(FILENAME_PATTERN)
            .map_err(|e| MigrationError::InvalidFormat(format!("Invalid regex: {e}")))?;

        match re.captures(filename) {
            Some(caps) => {
                let part = |i: usize| caps.get(i).map(|m| m.as_str().to_string()).unwrap_or_default();
                Ok((part(1), part(2), part(3)))
            }
            None => Err(MigrationError::InvalidFormat(format!(
                "Migration file name '{filename}' does not match expected pattern: _{{YYYYMMDDHHMM}}_{{name}}_migration.rs"
            ))),
        }
    }

    /// Read and inspect one migration artifact
    pub fn load(path: &Path) -> Result<Self, MigrationError> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MigrationError::InvalidFormat(format!("Invalid filename: {}", path.display())))?;

        let (identity, timestamp, name) = Self::parse_filename(filename)?;

        let source = fs::read_to_string(path).map_err(|e| MigrationError::Syntax {
            path: path.to_path_buf(),
            error: format!("cannot read file: {e}"),
        })?;

        let type_name = find_migration_type(path, &source)?;

        Ok(Self {
            path: path.to_path_buf(),
            identity,
            timestamp,
            name,
            type_name,
        })
    }
}

impl Identified for MigrationFile {
    fn identity(&self) -> &str {
        &self.identity
    }
}

/// Whether `path` carries the migration suffix marker
pub fn is_migration_artifact(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(MIGRATION_SUFFIX))
}

/// Find the single migration type defined in `source`
///
/// Only top-level `struct` and `enum` items count. The type must also have an
/// `impl Migration for <Type>` block in the same file.
pub fn find_migration_type(path: &Path, source: &str) -> Result<String, MigrationError> {
    let file = syn::parse_file(source).map_err(|e| MigrationError::Syntax {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    let mut candidates = Vec::new();
    let mut implemented = HashSet::new();

    for item in &file.items {
        match item {
            syn::Item::Struct(s) => candidates.push(s.ident.to_string()),
            syn::Item::Enum(e) => candidates.push(e.ident.to_string()),
            syn::Item::Impl(i) => {
                let implements_migration = i
                    .trait_
                    .as_ref()
                    .and_then(|(_, trait_path, _)| trait_path.segments.last())
                    .is_some_and(|seg| seg.ident == "Migration");
                if implements_migration {
                    if let syn::Type::Path(self_ty) = i.self_ty.as_ref() {
                        if let Some(seg) = self_ty.path.segments.last() {
                            implemented.insert(seg.ident.to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }

    candidates.retain(|name| name.ends_with("Migration") && !BASE_TYPE_NAMES.contains(&name.as_str()));

    match candidates.len() {
        0 => Err(MigrationError::NoMigrationType {
            path: path.to_path_buf(),
        }),
        1 => {
            let type_name = candidates.remove(0);
            if !implemented.contains(&type_name) {
                return Err(MigrationError::MissingCapability {
                    path: path.to_path_buf(),
                    type_name,
                });
            }
            Ok(type_name)
        }
        _ => Err(MigrationError::AmbiguousMigrationType {
            path: path.to_path_buf(),
            candidates,
        }),
    }
}

/// Discover all migration files under a directory
///
/// Walks `migrations_dir` recursively (skipping hidden directories and `target/`), loads
/// every file ending in `_migration.rs`, and returns them keyed by identity. A missing
/// directory yields an empty map. Any malformed artifact or identity collision aborts
/// the whole pass.
pub fn discover_migrations(migrations_dir: &Path) -> Result<HashMap<String, MigrationFile>, MigrationError> {
    let mut migrations = HashMap::new();

    if !migrations_dir.exists() {
        log::debug!("migration directory {} does not exist yet", migrations_dir.display());
        return Ok(migrations);
    }

    if !migrations_dir.is_dir() {
        return Err(MigrationError::InvalidFormat(format!(
            "Path is not a directory: {}",
            migrations_dir.display()
        )));
    }

    for path in artifact_paths(migrations_dir)? {
        let file = MigrationFile::load(&path)?;
        log::debug!("discovered {} ({})", file.identity, file.type_name);

        if let Some(existing) = migrations.get(&file.identity) {
            return Err(MigrationError::DuplicateIdentity {
                identity: file.identity.clone(),
                first: existing.path.clone(),
                second: file.path,
            });
        }
        migrations.insert(file.identity.clone(), file);
    }

    Ok(migrations)
}

/// Identities of every artifact under `migrations_dir`, judged by file name alone
///
/// Unlike [`discover_migrations`], file contents are not inspected.
pub fn scan_identities(migrations_dir: &Path) -> Result<Vec<String>, MigrationError> {
    if !migrations_dir.is_dir() {
        return Ok(Vec::new());
    }

    artifact_paths(migrations_dir)?
        .iter()
        .map(|path| {
            let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            MigrationFile::parse_filename(filename).map(|(identity, _, _)| identity)
        })
        .collect()
}

/// Paths of all artifacts, sorted so error reports are reproducible
fn artifact_paths(migrations_dir: &Path) -> Result<Vec<PathBuf>, MigrationError> {
    let mut paths = Vec::new();
    collect_artifacts(migrations_dir, &mut paths)?;
    paths.sort();
    Ok(paths)
}

fn collect_artifacts(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), MigrationError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        MigrationError::FileNotFound(format!("Failed to read migrations directory {}: {}", dir.display(), e))
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| MigrationError::FileNotFound(format!("Failed to read directory entry: {e}")))?;
        let path = entry.path();

        if path.is_dir() {
            let dir_name = entry.file_name().to_string_lossy().to_string();
            if dir_name.starts_with('.') || dir_name == "target" {
                continue;
            }
            collect_artifacts(&path, paths)?;
        } else if is_migration_artifact(&path) {
            paths.push(path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
        use monarch::migration::{Migration, MigrationContext};
        use monarch::DbError;

        #[derive(Debug, Default)]
        pub struct AddIndexesMigration;

        impl Migration for AddIndexesMigration {
            fn run(&self, _ctx: &MigrationContext<'_>) -> Result<(), DbError> {
                Ok(())
            }
        }
    "#;

    #[test]
    fn test_parse_filename() {
        let (identity, timestamp, name) =
            MigrationFile::parse_filename("_202401201200_add_indexes_migration.rs").unwrap();
        assert_eq!(identity, "_202401201200_add_indexes_migration");
        assert_eq!(timestamp, "202401201200");
        assert_eq!(name, "add_indexes");
    }

    #[test]
    fn test_parse_filename_rejects_bad_names() {
        for bad in [
            "202401201200_add_indexes_migration.rs",
            "_2024012012_add_indexes_migration.rs",
            "_202401201200_migration.rs",
            "_202401201200_add_indexes.rs",
        ] {
            assert!(
                matches!(MigrationFile::parse_filename(bad), Err(MigrationError::InvalidFormat(_))),
                "should reject {bad}"
            );
        }
    }

    #[test]
    fn test_find_migration_type() {
        let path = Path::new("_202401201200_add_indexes_migration.rs");
        assert_eq!(find_migration_type(path, VALID).unwrap(), "AddIndexesMigration");
    }

    #[test]
    fn test_find_migration_type_ignores_base_names_and_helpers() {
        let source = r#"
            pub struct BaseMigration;
            struct Helper;
            pub struct BackfillMigration;
            impl monarch::migration::Migration for BackfillMigration {
                fn run(&self, _ctx: &MigrationContext<'_>) -> Result<(), DbError> { Ok(()) }
            }
        "#;
        let path = Path::new("x.rs");
        assert_eq!(find_migration_type(path, source).unwrap(), "BackfillMigration");
    }

    #[test]
    fn test_find_migration_type_errors() {
        let path = Path::new("x.rs");

        let none = "pub struct Helper;";
        assert!(matches!(find_migration_type(path, none), Err(MigrationError::NoMigrationType { .. })));

        let two = "pub struct AMigration; pub struct BMigration;";
        match find_migration_type(path, two) {
            Err(MigrationError::AmbiguousMigrationType { candidates, .. }) => {
                assert_eq!(candidates, vec!["AMigration", "BMigration"]);
            }
            other => panic!("expected AmbiguousMigrationType, got {other:?}"),
        }

        let no_impl = "pub struct AMigration;";
        assert!(matches!(
            find_migration_type(path, no_impl),
            Err(MigrationError::MissingCapability { ref type_name, .. }) if type_name == "AMigration"
        ));

        let broken = "pub struct AMigration {";
        assert!(matches!(find_migration_type(path, broken), Err(MigrationError::Syntax { .. })));
    }
}

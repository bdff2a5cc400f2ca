//! Migration template generation

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use monarch::migration::{scan_identities, MigrationError};
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

/// Create a new migration artifact in `migrations_dir`
///
/// The directory (and its parents) is created if missing. The new artifact's identity
/// always sorts after every artifact already in the directory: when `now` would not
/// achieve that, the timestamp moves to one minute past the newest existing one.
///
/// # Errors
///
/// - `InvalidName` if `name` has no letters or digits
/// - `Directory` if the directory or file cannot be created
/// - discovery errors if an existing artifact name is malformed
pub fn generate(migrations_dir: &Path, name: &str, now: DateTime<Utc>) -> Result<PathBuf, MigrationError> {
    let name = normalize_name(name)?;

    fs::create_dir_all(migrations_dir).map_err(|source| MigrationError::Directory {
        path: migrations_dir.to_path_buf(),
        source,
    })?;

    let timestamp = next_timestamp(migrations_dir, &name, now)?;
    let identity = format!("_{timestamp}_{name}_migration");
    let path = migrations_dir.join(format!("{identity}.rs"));

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|source| MigrationError::Directory {
            path: path.clone(),
            source,
        })?;
    file.write_all(render_template(&identity, &type_name(&name)).as_bytes())
        .map_err(|source| MigrationError::Directory {
            path: path.clone(),
            source,
        })?;

    log::info!("generated {}", path.display());
    Ok(path)
}

/// Normalize a user-supplied name to lowercase snake_case
///
/// `"Add Indexes"`, `"add-indexes"` and `"AddIndexes"` all become `add_indexes`.
///
/// # Errors
///
/// Returns `MigrationError::InvalidName` when nothing alphanumeric is left.
pub fn normalize_name(name: &str) -> Result<String, MigrationError> {
    let invalid = |e: regex::Error| MigrationError::InvalidName(format!("{name} ({e})"));
    let camel = Regex::new(r"([a-z0-9])([A-Z])").map_err(invalid)?;
    let separators = Regex::new(r"[^a-z0-9]+").map_err(invalid)?;

    let split = camel.replace_all(name.trim(), "${1}_${2}").to_lowercase();
    let snake = separators.replace_all(&split, "_");
    let snake = snake.trim_matches('_');

    if snake.is_empty() {
        return Err(MigrationError::InvalidName(name.to_string()));
    }
    Ok(snake.to_string())
}

/// `add_indexes` → `AddIndexesMigration`
pub fn type_name(snake: &str) -> String {
    let mut camel: String = snake
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    // Type names cannot start with a digit
    if camel.starts_with(|c: char| c.is_ascii_digit()) {
        camel.insert(0, 'M');
    }
    camel.push_str("Migration");
    camel
}

fn next_timestamp(migrations_dir: &Path, name: &str, now: DateTime<Utc>) -> Result<String, MigrationError> {
    let candidate = now.format(TIMESTAMP_FORMAT).to_string();
    let candidate_identity = format!("_{candidate}_{name}_migration");

    let existing = scan_identities(migrations_dir)?;
    let Some(newest) = existing.iter().max() else {
        return Ok(candidate);
    };
    if candidate_identity > *newest {
        return Ok(candidate);
    }

    // Identities are `_` + 12 digits + `_...`, checked by scan_identities
    let newest_timestamp = newest.get(1..13).unwrap_or_default();
    let newest_at = NaiveDateTime::parse_from_str(newest_timestamp, TIMESTAMP_FORMAT).map_err(|e| {
        MigrationError::InvalidFormat(format!("bad timestamp in '{newest}': {e}"))
    })?;
    let bumped = (newest_at + Duration::minutes(1)).format(TIMESTAMP_FORMAT).to_string();
    log::debug!("{candidate} does not sort after {newest}, using {bumped}");
    Ok(bumped)
}

/// Source of a fresh migration stub whose `run` fails with `DbError::NotImplemented`
pub fn render_template(identity: &str, type_name: &str) -> String {
    format!(
        r#"//! Migration {identity}

use monarch::migration::{{Migration, MigrationContext}};
use monarch::DbError;

#[derive(Debug, Default)]
pub struct {type_name};

impl Migration for {type_name} {{
    /// Move the datastore from one state to the next.
    ///
    /// Return an error to halt the run; the migration stays pending until `run`
    /// succeeds. Nothing is rolled back for you, so keep the logic idempotent or
    /// wrap it in a transaction.
    fn run(&self, ctx: &MigrationContext<'_>) -> Result<(), DbError> {{
        Err(DbError::NotImplemented(ctx.identity().to_string()))
    }}
}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("add indexes").unwrap(), "add_indexes");
        assert_eq!(normalize_name("Add-Indexes!").unwrap(), "add_indexes");
        assert_eq!(normalize_name("AddIndexesToUsers").unwrap(), "add_indexes_to_users");
        assert_eq!(normalize_name("  __backfill__v2 ").unwrap(), "backfill_v2");
        assert!(matches!(normalize_name(" -- "), Err(MigrationError::InvalidName(_))));
        assert!(matches!(normalize_name(""), Err(MigrationError::InvalidName(_))));
    }

    #[test]
    fn test_type_name() {
        assert_eq!(type_name("add_indexes"), "AddIndexesMigration");
        assert_eq!(type_name("backfill_v2"), "BackfillV2Migration");
        assert_eq!(type_name("2fa_secrets"), "M2faSecretsMigration");
    }
}

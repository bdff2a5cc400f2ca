//! Tests for build_script module

use chrono::{TimeZone, Utc};
use monarch_migrate::build_script;
use monarch_migrate::generate::generate;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_generate_manifest_empty_directory() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("out").join(build_script::MANIFEST_FILE);

    let files = build_script::generate_manifest(temp_dir.path().join("migrations"), &output).unwrap();

    assert!(files.is_empty());
    let manifest = fs::read_to_string(&output).unwrap();
    assert!(manifest.contains("pub mod migrations {"));
    assert!(manifest.contains("Ok(::monarch::migration::MigrationRegistry::new())"));
    syn::parse_file(&manifest).unwrap();
}

#[test]
fn test_generate_manifest_registers_each_migration() {
    let temp_dir = TempDir::new().unwrap();
    let migrations_dir = temp_dir.path().join("migrations");
    let now = Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap();
    generate(&migrations_dir, "create users", now).unwrap();
    generate(&migrations_dir, "add indexes", now).unwrap();

    let output = temp_dir.path().join(build_script::MANIFEST_FILE);
    let files = build_script::generate_manifest(&migrations_dir, &output).unwrap();

    let identities: Vec<&str> = files.iter().map(|f| f.identity.as_str()).collect();
    assert_eq!(
        identities,
        vec!["_202401201200_create_users_migration", "_202401201201_add_indexes_migration"]
    );
    assert!(files.iter().all(|f| f.path.is_absolute()));

    let manifest = fs::read_to_string(&output).unwrap();
    assert!(manifest.contains("pub mod _202401201200_create_users_migration;"));
    assert!(manifest.contains(
        "registry.register::<migrations::_202401201200_create_users_migration::CreateUsersMigration>(\"_202401201200_create_users_migration\")?;"
    ));
    assert!(manifest.contains(
        "registry.register::<migrations::_202401201201_add_indexes_migration::AddIndexesMigration>(\"_202401201201_add_indexes_migration\")?;"
    ));
    syn::parse_file(&manifest).unwrap();
}

#[test]
fn test_generate_manifest_fails_on_malformed_artifact() {
    let temp_dir = TempDir::new().unwrap();
    let migrations_dir = temp_dir.path().join("migrations");
    fs::create_dir_all(&migrations_dir).unwrap();
    fs::write(
        migrations_dir.join("_202401201200_broken_migration.rs"),
        "pub struct HelperOnly;",
    )
    .unwrap();

    let output = temp_dir.path().join(build_script::MANIFEST_FILE);
    let err = build_script::generate_manifest(&migrations_dir, &output).unwrap_err();

    assert!(format!("{err:#}").contains("defines no type ending in 'Migration'"));
    assert!(!output.exists());
}

#[test]
fn test_generate_manifest_skips_target_directory() {
    let temp_dir = TempDir::new().unwrap();
    let migrations_dir = temp_dir.path().join("migrations");
    let now = Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap();
    generate(&migrations_dir, "create users", now).unwrap();

    // A stale copy under target/ must not count as a duplicate
    let target_dir = migrations_dir.join("target");
    fs::create_dir_all(&target_dir).unwrap();
    fs::copy(
        migrations_dir.join("_202401201200_create_users_migration.rs"),
        target_dir.join("_202401201200_create_users_migration.rs"),
    )
    .unwrap();

    let output = temp_dir.path().join(build_script::MANIFEST_FILE);
    let files = build_script::generate_manifest(&migrations_dir, &output).unwrap();
    assert_eq!(files.len(), 1);
}

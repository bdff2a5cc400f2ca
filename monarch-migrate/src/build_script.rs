//! Build script helper for migration manifest generation
//!
//! Rust cannot load migration files at run time, so a runner binary compiles them in.
//! Call [`generate_manifest`] from the runner crate's `build.rs`:
//!
//! ```rust,ignore
//! fn main() -> anyhow::Result<()> {
//!     let out_dir = std::path::PathBuf::from(std::env::var("OUT_DIR")?);
//!     monarch_migrate::build_script::generate_manifest(
//!         "migrations",
//!         out_dir.join(monarch_migrate::build_script::MANIFEST_FILE),
//!     )?;
//!     Ok(())
//! }
//! ```
//!
//! and include the result in `main.rs`:
//!
//! ```rust,ignore
//! include!(concat!(env!("OUT_DIR"), "/migration_manifest.rs"));
//!
//! fn main() -> std::process::ExitCode {
//!     match registry() {
//!         Ok(registry) => monarch_migrate::cli::main_with_registry(registry),
//!         Err(e) => {
//!             eprintln!("{e}");
//!             std::process::ExitCode::FAILURE
//!         }
//!     }
//! }
//! ```
//!
//! The runner crate needs `monarch` as a dependency, since the manifest and the
//! migration files refer to it.

use anyhow::{bail, Context, Result};
use monarch::migration::{MigrationFile, Migrator};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// File name the manifest is conventionally written to inside `OUT_DIR`
pub const MANIFEST_FILE: &str = "migration_manifest.rs";

/// Discover migrations and write the registry manifest
///
/// Emits `cargo:rerun-if-changed` for the directory and every artifact so that adding
/// or editing a migration rebuilds the runner. Returns the migrations included, in
/// execution order.
///
/// # Errors
///
/// Fails on any discovery error, on module name collisions, or if the manifest cannot
/// be written.
pub fn generate_manifest(
    migrations_dir: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> Result<Vec<MigrationFile>> {
    let migrations_dir = migrations_dir.as_ref();
    let output_path = output_path.as_ref();

    println!("cargo:rerun-if-changed={}", migrations_dir.display());

    let mut files = Migrator::new(migrations_dir)
        .discover()
        .with_context(|| format!("discovering migrations in {}", migrations_dir.display()))?
        .into_vec();

    // Manifest lives in OUT_DIR, so `#[path]` needs absolute paths
    for file in &mut files {
        println!("cargo:rerun-if-changed={}", file.path.display());
        file.path = fs::canonicalize(&file.path)
            .with_context(|| format!("resolving {}", file.path.display()))?;
    }

    let manifest = render_manifest(&files)?;

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(output_path, manifest)
        .with_context(|| format!("writing {}", output_path.display()))?;

    Ok(files)
}

/// Render the manifest source for `files`
///
/// The output declares `pub mod migrations` (one submodule per artifact) and
/// `pub fn registry()` registering each migration type under its identity.
///
/// # Errors
///
/// Fails if two identities map to the same module name.
pub fn render_manifest(files: &[MigrationFile]) -> Result<String> {
    let mut modules: HashMap<String, &str> = HashMap::new();
    for file in files {
        let module = module_name(&file.identity);
        if let Some(previous) = modules.insert(module.clone(), &file.identity) {
            bail!(
                "migrations '{}' and '{}' map to the same module name '{}'",
                previous,
                file.identity,
                module
            );
        }
    }

    let mut out = String::new();
    out.push_str("// @generated by monarch_migrate::build_script. Do not edit.\n\n");

    out.push_str("pub mod migrations {\n");
    for file in files {
        let path = file.path.to_string_lossy().replace('\\', "/");
        writeln!(out, "    #[path = r#\"{path}\"#]")?;
        writeln!(out, "    pub mod {};", module_name(&file.identity))?;
    }
    out.push_str("}\n\n");

    out.push_str("/// Registry of every migration compiled into this binary\n");
    out.push_str(
        "pub fn registry() -> ::std::result::Result<::monarch::migration::MigrationRegistry, ::monarch::migration::MigrationError> {\n",
    );
    if files.is_empty() {
        out.push_str("    Ok(::monarch::migration::MigrationRegistry::new())\n");
    } else {
        out.push_str("    let mut registry = ::monarch::migration::MigrationRegistry::new();\n");
        for file in files {
            writeln!(
                out,
                "    registry.register::<migrations::{}::{}>(\"{}\")?;",
                module_name(&file.identity),
                file.type_name,
                file.identity
            )?;
        }
        out.push_str("    Ok(registry)\n");
    }
    out.push_str("}\n");

    Ok(out)
}

/// Identity → Rust module name
///
/// Generated identities are already valid (`_` + digits + snake_case); hand-named files
/// may contain other characters, which become `_`.
fn module_name(identity: &str) -> String {
    identity
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_name() {
        assert_eq!(
            module_name("_202401201200_add_indexes_migration"),
            "_202401201200_add_indexes_migration"
        );
        assert_eq!(
            module_name("_202401201200_add-Indexes_migration"),
            "_202401201200_add_indexes_migration"
        );
    }
}

//! Stock `monarch` binary
//!
//! Carries an empty registry: `generate` and `list` work on any project, while `migrate`
//! reports every artifact as unregistered. Projects build their own runner around the
//! manifest from [`monarch_migrate::build_script`].

use monarch::migration::MigrationRegistry;
use std::process::ExitCode;

fn main() -> ExitCode {
    monarch_migrate::cli::main_with_registry(MigrationRegistry::new())
}

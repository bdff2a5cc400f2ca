//! Migration system for Monarch
//!
//! A migration is a Rust source file in the migration directory, named
//! `_{YYYYMMDDHHMM}_{name}_migration.rs`, that defines one type implementing
//! [`Migration`]. This module provides:
//! - Discovery of migration files and the types they define
//! - A registry mapping each identity to constructible logic
//! - Deterministic ordering by identity
//! - Execution record stores (PostgreSQL, JSON file, in-memory)
//! - The runner that applies pending migrations and records them
//!
//! # Example
//!
//! ```rust,no_run
//! use monarch::migration::{
//!     InMemoryStore, Migration, MigrationContext, MigrationRegistry, Migrator, Runner,
//! };
//! use monarch::DbError;
//!
//! #[derive(Default)]
//! pub struct CreateUsersMigration;
//!
//! impl Migration for CreateUsersMigration {
//!     fn run(&self, ctx: &MigrationContext<'_>) -> Result<(), DbError> {
//!         ctx.execute("CREATE TABLE users (id BIGSERIAL PRIMARY KEY, email TEXT NOT NULL)", &[])?;
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), monarch::migration::MigrationError> {
//! let mut registry = MigrationRegistry::new();
//! registry.register::<CreateUsersMigration>("_202401201200_create_users_migration")?;
//!
//! let store = InMemoryStore::new();
//! let mut runner = Runner::new(&store);
//! let report = Migrator::new("./migrations").migrate(&registry, &mut runner)?;
//! report.into_result()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod file;
pub mod file_store;
pub mod migration;
pub mod migrator;
pub mod order;
pub mod record;
pub mod registry;
pub mod runner;
pub mod state_table;
pub mod status;
pub mod store;

pub use error::MigrationError;
pub use file::{discover_migrations, scan_identities, MigrationFile};
pub use file_store::JsonFileStore;
pub use migration::{Identified, Migration, MigrationContext, MigrationUnit};
pub use migrator::Migrator;
pub use order::{order, Ordered};
pub use record::ExecutionRecord;
pub use registry::MigrationRegistry;
pub use runner::{MigrationState, RunEvent, RunReport, Runner};
pub use state_table::{create_state_table, PostgresStore, STATE_TABLE};
pub use status::MigrationStatus;
pub use store::{ExecutionStore, InMemoryStore, StoreError};

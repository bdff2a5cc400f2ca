//! Runner configuration.
//!
//! [`MonarchConfig::load`] reads `monarch.toml` (optional) and then environment variables
//! prefixed with `MONARCH__`, e.g. `MONARCH__MIGRATION_DIRECTORY=db/migrations`.
//! The resulting value is passed explicitly to whatever needs it.

use config::{Config, Environment, File};
pub use config::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration file, resolved against the working directory
pub const CONFIG_FILE: &str = "monarch.toml";

/// Where execution records are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatastoreKind {
    /// The `monarch_migrations` table in PostgreSQL
    #[default]
    Postgres,
    /// A JSON ledger file on disk
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonarchConfig {
    #[serde(default = "default_migration_directory")]
    pub migration_directory: PathBuf,
    #[serde(default)]
    pub datastore: DatastoreKind,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

fn default_migration_directory() -> PathBuf {
    PathBuf::from("./migrations")
}

fn default_state_file() -> PathBuf {
    PathBuf::from("monarch_state.json")
}

impl Default for MonarchConfig {
    fn default() -> Self {
        Self {
            migration_directory: default_migration_directory(),
            datastore: DatastoreKind::default(),
            database_url: None,
            state_file: default_state_file(),
        }
    }
}

impl MonarchConfig {
    /// Load the configuration from `monarch.toml`, falling back to env vars.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load the configuration from a specific TOML file (optional) plus env vars.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("MONARCH").separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                // A present-but-broken file is worth a warning; env vars still apply
                if path.exists() {
                    log::warn!(
                        "failed to load {}, falling back to env: {}",
                        path.display(),
                        err
                    );
                }
                Config::builder()
                    .add_source(Environment::with_prefix("MONARCH").separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        settings.try_deserialize::<MonarchConfig>()
    }

    /// The database URL from the config, or `MONARCH_DATABASE_URL` / `DATABASE_URL`.
    pub fn resolved_database_url(&self) -> Option<String> {
        self.database_url
            .clone()
            .or_else(|| std::env::var("MONARCH_DATABASE_URL").ok())
            .or_else(|| std::env::var("DATABASE_URL").ok())
    }
}

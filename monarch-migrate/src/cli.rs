//! Command-line interface: `generate`, `list` and `migrate`

use crate::generate::generate;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use monarch::config::ConfigError;
use monarch::migration::{
    ExecutionStore, JsonFileStore, MigrationError, MigrationRegistry, Migrator, PostgresStore,
    RunEvent, Runner, StoreError,
};
use monarch::{connect, ConnectionError, DatastoreKind, DbExecutor, MayPostgresExecutor, MonarchConfig};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "monarch")]
#[command(about = "Run-once, timestamp-ordered migrations")]
#[command(version)]
pub struct Cli {
    /// Directory holding migration files [default: ./migrations]
    #[arg(long, global = true)]
    pub migration_directory: Option<PathBuf>,

    /// Where execution records are kept [default: postgres]
    #[arg(long, value_enum, global = true)]
    pub datastore: Option<DatastoreArg>,

    /// Database connection URL (postgres datastore)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Ledger file (file datastore) [default: monarch_state.json]
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Generate a new migration file
    Generate {
        /// Migration name (e.g., "add indexes to users")
        name: String,
    },

    /// List migrations that have not been applied yet
    List,

    /// Apply pending migrations in order
    Migrate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DatastoreArg {
    Postgres,
    File,
}

impl From<DatastoreArg> for DatastoreKind {
    fn from(arg: DatastoreArg) -> Self {
        match arg {
            DatastoreArg::Postgres => DatastoreKind::Postgres,
            DatastoreArg::File => DatastoreKind::File,
        }
    }
}

impl Cli {
    /// Command-line flags win over file and environment values
    pub fn apply_overrides(&self, mut config: MonarchConfig) -> MonarchConfig {
        if let Some(dir) = &self.migration_directory {
            config.migration_directory = dir.clone();
        }
        if let Some(datastore) = self.datastore {
            config.datastore = datastore.into();
        }
        if let Some(url) = &self.database_url {
            config.database_url = Some(url.clone());
        }
        if let Some(state_file) = &self.state_file {
            config.state_file = state_file.clone();
        }
        config
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("execution store error: {0}")]
    Store(#[from] StoreError),

    #[error("cannot connect to database: {0}")]
    Connection(#[from] ConnectionError),

    #[error("database URL not provided. Use --database-url or set MONARCH_DATABASE_URL or DATABASE_URL, or pass --datastore file")]
    MissingDatabaseUrl,

    #[error("cannot write output: {0}")]
    Output(#[from] io::Error),
}

impl CliError {
    /// Identity of the migration that caused this error, if any
    #[must_use]
    pub fn migration_identity(&self) -> Option<&str> {
        match self {
            CliError::Migration(e) => e.identity(),
            _ => None,
        }
    }
}

/// Entry point for runner binaries
///
/// Parses arguments, loads `.env` and configuration, runs the command and maps the
/// outcome to an exit code: 0 on success, 1 on any error or failed migration.
pub fn main_with_registry(registry: MigrationRegistry) -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let mut stdout = io::stdout().lock();
    match run(&cli, &registry, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            if let Some(identity) = e.migration_identity() {
                eprintln!("{} {}", "migration:".yellow(), identity);
            }
            ExitCode::FAILURE
        }
    }
}

/// Resolve configuration for `cli` and execute its command
///
/// # Errors
///
/// Any configuration, discovery, store or migration error.
pub fn run(cli: &Cli, registry: &MigrationRegistry, out: &mut dyn Write) -> Result<(), CliError> {
    let config = cli.apply_overrides(MonarchConfig::load()?);
    log::debug!("configuration: {config:?}");
    execute(&cli.command, &config, registry, out)
}

/// Execute one command against an explicit configuration
///
/// # Errors
///
/// Any discovery, store or migration error. A migration that fails during `migrate`
/// is returned as `CliError::Migration` after progress has been written.
pub fn execute(
    command: &Commands,
    config: &MonarchConfig,
    registry: &MigrationRegistry,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let migrator = Migrator::new(&config.migration_directory);
    match command {
        Commands::Generate { name } => handle_generate(&config.migration_directory, name, out),
        Commands::List => with_store(config, |store, _| handle_list(&migrator, store, out)),
        Commands::Migrate => with_store(config, |store, executor| {
            handle_migrate(&migrator, registry, store, executor, out)
        }),
    }
}

/// Open the configured execution store and pass it to `f`
fn with_store<F>(config: &MonarchConfig, f: F) -> Result<(), CliError>
where
    F: FnOnce(&dyn ExecutionStore, Option<&dyn DbExecutor>) -> Result<(), CliError>,
{
    match config.datastore {
        DatastoreKind::File => {
            let store = JsonFileStore::new(&config.state_file);
            log::debug!("using ledger file {}", store.path().display());
            f(&store, None)
        }
        DatastoreKind::Postgres => {
            let url = config
                .resolved_database_url()
                .ok_or(CliError::MissingDatabaseUrl)?;
            let executor = MayPostgresExecutor::new(connect(&url)?);
            let store = PostgresStore::new(&executor);
            store.initialize()?;
            f(&store, Some(&executor))
        }
    }
}

fn handle_generate(migrations_dir: &Path, name: &str, out: &mut dyn Write) -> Result<(), CliError> {
    let path = generate(migrations_dir, name, Utc::now())?;
    writeln!(out, "Generated migration template: [{}]", path.display())?;
    Ok(())
}

fn handle_list(migrator: &Migrator, store: &dyn ExecutionStore, out: &mut dyn Write) -> Result<(), CliError> {
    let pending = migrator.pending(store)?;

    if pending.is_empty() {
        writeln!(out, "No pending migrations")?;
        return Ok(());
    }

    writeln!(out, "The following migrations have not yet been applied:")?;
    for file in &pending {
        writeln!(out, "{}", file.identity)?;
    }
    Ok(())
}

fn handle_migrate(
    migrator: &Migrator,
    registry: &MigrationRegistry,
    store: &dyn ExecutionStore,
    executor: Option<&dyn DbExecutor>,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let report = {
        let mut runner = Runner::new(store).on_event(|event| {
            if let Err(e) = print_event(&mut *out, event) {
                log::warn!("cannot write progress: {e}");
            }
        });
        if let Some(executor) = executor {
            runner = runner.with_executor(executor);
        }
        migrator.migrate(registry, &mut runner)?
    };

    if let Some(failure) = report.failure {
        return Err(failure.into());
    }

    if report.applied.is_empty() && report.skipped.is_empty() {
        writeln!(out, "No migrations exist")?;
    } else if report.applied.is_empty() {
        writeln!(out, "No pending migrations")?;
    } else {
        writeln!(
            out,
            "{} {} applied, {} already applied",
            "Done:".green().bold(),
            report.applied.len(),
            report.skipped.len()
        )?;
    }
    Ok(())
}

fn print_event(out: &mut dyn Write, event: &RunEvent<'_>) -> io::Result<()> {
    match event {
        RunEvent::Skipped { identity } => {
            writeln!(out, "  {} {identity}", "skipped ".dimmed())
        }
        RunEvent::Started { identity } => {
            writeln!(out, "  {} {identity}", "applying".cyan())
        }
        RunEvent::Applied { identity, elapsed } => {
            writeln!(out, "  {} {identity} ({elapsed:.2?})", "applied ".green())
        }
        RunEvent::Failed { identity, error } => {
            writeln!(out, "  {} {identity}: {error}", "failed  ".red().bold())
        }
    }
}

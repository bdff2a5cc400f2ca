//! Runner - applies pending migrations in order, stopping at the first failure

use crate::DbExecutor;
#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
use crate::migration::{
    ExecutionStore, MigrationContext, MigrationError, MigrationUnit, Ordered,
};
use chrono::Utc;
use std::fmt;
use std::time::{Duration, Instant};

/// Per-migration state during a run
///
/// `Applied` outlives the run through the execution record. `Failed` does not: the
/// migration has no record, so the next run sees it as `Pending` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Pending,
    Running,
    Applied,
    Failed,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MigrationState::Pending => "pending",
            MigrationState::Running => "running",
            MigrationState::Applied => "applied",
            MigrationState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Progress notification passed to [`Runner::on_event`]
#[derive(Debug)]
pub enum RunEvent<'a> {
    /// Already recorded, logic not invoked
    Skipped { identity: &'a str },
    /// Logic about to run
    Started { identity: &'a str },
    /// Logic succeeded and the record was written
    Applied { identity: &'a str, elapsed: Duration },
    /// The run stops here
    Failed { identity: &'a str, error: &'a MigrationError },
}

impl RunEvent<'_> {
    pub fn identity(&self) -> &str {
        match self {
            RunEvent::Skipped { identity }
            | RunEvent::Started { identity }
            | RunEvent::Applied { identity, .. }
            | RunEvent::Failed { identity, .. } => *identity,
        }
    }

    /// State the migration is in once this event has been emitted
    pub fn state(&self) -> MigrationState {
        match self {
            RunEvent::Skipped { .. } | RunEvent::Applied { .. } => MigrationState::Applied,
            RunEvent::Started { .. } => MigrationState::Running,
            RunEvent::Failed { .. } => MigrationState::Failed,
        }
    }
}

/// Outcome of one runner pass
#[derive(Debug, Default)]
pub struct RunReport {
    /// Identities applied during this pass, in order
    pub applied: Vec<String>,
    /// Identities that already had a record
    pub skipped: Vec<String>,
    /// The error that halted the pass, if any
    pub failure: Option<MigrationError>,
}

impl RunReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// `Ok(self)` when nothing failed, otherwise the halting error
    ///
    /// # Errors
    ///
    /// Returns the `MigrationError` stored in `failure`.
    pub fn into_result(mut self) -> Result<Self, MigrationError> {
        match self.failure.take() {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }
}

type EventHandler<'a> = Box<dyn FnMut(&RunEvent<'_>) + 'a>;

/// Sequential migration runner
///
/// Migrations run one at a time in the order given. A migration whose logic or
/// bookkeeping fails halts the pass; later migrations are not attempted. Nothing is
/// rolled back.
pub struct Runner<'a> {
    store: &'a dyn ExecutionStore,
    executor: Option<&'a dyn DbExecutor>,
    on_event: Option<EventHandler<'a>>,
}

impl<'a> Runner<'a> {
    /// Runner whose migrations get no database connection
    pub fn new(store: &'a dyn ExecutionStore) -> Self {
        Self {
            store,
            executor: None,
            on_event: None,
        }
    }

    /// Hand `executor` to every migration through its context
    #[must_use]
    pub fn with_executor(mut self, executor: &'a dyn DbExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Observe progress
    #[must_use]
    pub fn on_event(mut self, handler: impl FnMut(&RunEvent<'_>) + 'a) -> Self {
        self.on_event = Some(Box::new(handler));
        self
    }

    /// Run every pending migration in `migrations`
    ///
    /// Always returns a report. Check `failure` (or call `into_result`) to learn
    /// whether the pass completed.
    pub fn run(&mut self, migrations: &Ordered<MigrationUnit>) -> RunReport {
        let mut report = RunReport::default();

        for unit in migrations {
            let identity = unit.identity();

            let has_run = match self.store.has_run(identity) {
                Ok(has_run) => has_run,
                Err(error) => {
                    let error = MigrationError::Persistence {
                        identity: identity.to_string(),
                        error,
                    };
                    self.fail(identity, error, &mut report);
                    break;
                }
            };

            if has_run {
                log::info!("{identity} already applied, skipping");
                #[cfg(feature = "metrics")]
                METRICS.record_skipped();
                self.emit(&RunEvent::Skipped { identity });
                report.skipped.push(identity.to_string());
                continue;
            }

            match self.apply(unit) {
                Ok(elapsed) => {
                    log::info!("applied {identity} in {elapsed:?}");
                    #[cfg(feature = "metrics")]
                    METRICS.record_applied(identity, elapsed);
                    self.emit(&RunEvent::Applied { identity, elapsed });
                    report.applied.push(identity.to_string());
                }
                Err(error) => {
                    self.fail(identity, error, &mut report);
                    break;
                }
            }
        }

        if report.is_success() {
            log::info!(
                "run complete: {} applied, {} already applied",
                report.applied.len(),
                report.skipped.len()
            );
        }
        report
    }

    /// Run one unit's logic, then record it
    fn apply(&mut self, unit: &MigrationUnit) -> Result<Duration, MigrationError> {
        let identity = unit.identity();

        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("monarch.migration", migration = identity).entered();

        self.emit(&RunEvent::Started { identity });
        log::info!("applying {identity}");

        let ctx = MigrationContext::new(identity, self.executor);
        let start = Instant::now();
        unit.run(&ctx).map_err(|error| MigrationError::ExecutionFailed {
            identity: identity.to_string(),
            error,
        })?;
        let elapsed = start.elapsed();

        // Written only after the logic returned Ok; a failed write leaves the unit pending
        self.store
            .record_success(identity, Utc::now())
            .map_err(|error| MigrationError::Persistence {
                identity: identity.to_string(),
                error,
            })?;

        Ok(elapsed)
    }

    fn fail(&mut self, identity: &str, error: MigrationError, report: &mut RunReport) {
        log::error!("{error}");
        log::warn!("halting run at {identity}; later migrations were not attempted");
        #[cfg(feature = "metrics")]
        METRICS.record_failed(identity);
        self.emit(&RunEvent::Failed {
            identity,
            error: &error,
        });
        report.failure = Some(error);
    }

    fn emit(&mut self, event: &RunEvent<'_>) {
        if let Some(handler) = self.on_event.as_mut() {
            handler(event);
        }
    }
}

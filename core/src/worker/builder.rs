//! Builder pattern for Worker construction

use crate::config::{CycleMode, ReadinessConfig, RunConfig};
use crate::error::{BenchError, BenchResult};
use crate::outcome::CycleOutcome;
use crate::traits::{RemoteCommandExecutor, ResourceLifecycleClient};
use crate::unit::UnitTemplate;

use super::executor::Worker;

use std::sync::Arc;
use tokio::sync::mpsc;

/// Builder for creating Worker instances
///
/// The platform clients and the outcome sender are required; cycle settings
/// fall back to [`RunConfig::default`].
///
/// # Example
/// ```ignore
/// let worker = WorkerBuilder::new(0)
///     .lifecycle(lifecycle)
///     .executor(executor)
///     .outcome_tx(tx)
///     .mode(CycleMode::Repeat)
///     .build()?;
/// ```
pub struct WorkerBuilder {
    id: usize,
    lifecycle: Option<Arc<dyn ResourceLifecycleClient>>,
    executor: Option<Arc<dyn RemoteCommandExecutor>>,
    outcome_tx: Option<mpsc::Sender<CycleOutcome>>,
    mode: CycleMode,
    readiness: ReadinessConfig,
    command: Vec<String>,
    template: UnitTemplate,
    name_prefix: String,
}

impl WorkerBuilder {
    /// Create a new builder with the given worker ID
    pub fn new(id: usize) -> Self {
        let defaults = RunConfig::default();
        Self {
            id,
            lifecycle: None,
            executor: None,
            outcome_tx: None,
            mode: defaults.mode,
            readiness: defaults.readiness,
            command: defaults.command,
            template: defaults.template,
            name_prefix: defaults.name_prefix,
        }
    }

    /// Take mode, readiness, command, template and prefix from a run config
    pub fn run_config(mut self, config: &RunConfig) -> Self {
        self.mode = config.mode;
        self.readiness = config.readiness;
        self.command = config.command.clone();
        self.template = config.template.clone();
        self.name_prefix = config.name_prefix.clone();
        self
    }

    /// Set the lifecycle client
    pub fn lifecycle(mut self, lifecycle: Arc<dyn ResourceLifecycleClient>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Set the exec client
    pub fn executor(mut self, executor: Arc<dyn RemoteCommandExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Set the outcome channel sender
    pub fn outcome_tx(mut self, tx: mpsc::Sender<CycleOutcome>) -> Self {
        self.outcome_tx = Some(tx);
        self
    }

    /// Set the cycle mode
    pub fn mode(mut self, mode: CycleMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the readiness poll settings
    pub fn readiness(mut self, readiness: ReadinessConfig) -> Self {
        self.readiness = readiness;
        self
    }

    /// Set the exec command
    pub fn command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }

    /// Set the unit template
    pub fn template(mut self, template: UnitTemplate) -> Self {
        self.template = template;
        self
    }

    /// Set the unit name prefix
    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Build the Worker
    ///
    /// # Errors
    /// Returns an error if any required field is missing.
    pub fn build(self) -> BenchResult<Worker> {
        let lifecycle = self
            .lifecycle
            .ok_or_else(|| BenchError::missing_config("lifecycle"))?;
        let executor = self
            .executor
            .ok_or_else(|| BenchError::missing_config("executor"))?;
        let outcome_tx = self
            .outcome_tx
            .ok_or_else(|| BenchError::missing_config("outcome_tx"))?;

        Ok(Worker::new(
            self.id,
            lifecycle,
            executor,
            outcome_tx,
            self.mode,
            self.readiness,
            self.command,
            self.template,
            self.name_prefix,
        ))
    }
}

//! Builder pattern for WorkloadDriver construction

use std::sync::Arc;

use crate::channel::ChannelConfig;
use crate::config::{CycleMode, RunConfig};
use crate::error::{BenchError, BenchResult};
use crate::traits::{RemoteCommandExecutor, ResourceLifecycleClient};

use super::executor::WorkloadDriver;

/// Builder for creating a WorkloadDriver with validated configuration
///
/// # Example
///
/// ```ignore
/// let driver = DriverBuilder::new()
///     .slots(10)
///     .mode(CycleMode::Repeat)
///     .lifecycle(lifecycle)
///     .executor(executor)
///     .build()?;
/// ```
pub struct DriverBuilder {
    config: RunConfig,
    lifecycle: Option<Arc<dyn ResourceLifecycleClient>>,
    executor: Option<Arc<dyn RemoteCommandExecutor>>,
    channel_config: ChannelConfig,
}

impl DriverBuilder {
    /// Create a new driver builder with default configuration
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
            lifecycle: None,
            executor: None,
            channel_config: ChannelConfig::default(),
        }
    }

    /// Set the full run configuration
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the worker slot count
    pub fn slots(mut self, slots: usize) -> Self {
        self.config.slots = slots;
        self
    }

    /// Set the cycle mode
    pub fn mode(mut self, mode: CycleMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the lifecycle client
    pub fn lifecycle(mut self, lifecycle: Arc<dyn ResourceLifecycleClient>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Set the command executor
    pub fn executor(mut self, executor: Arc<dyn RemoteCommandExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Set the channel configuration
    pub fn channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel_config = config;
        self
    }

    /// Build the driver
    ///
    /// # Errors
    ///
    /// Returns an error if the lifecycle client or executor is not set, or if
    /// configuration validation fails.
    pub fn build(self) -> BenchResult<WorkloadDriver> {
        let lifecycle = self
            .lifecycle
            .ok_or_else(|| BenchError::missing_config("lifecycle"))?;

        let executor = self
            .executor
            .ok_or_else(|| BenchError::missing_config("executor"))?;

        self.config
            .validate()
            .map_err(|e| BenchError::config(e.to_string()))?;

        Ok(WorkloadDriver::new(
            self.config,
            lifecycle,
            executor,
            self.channel_config,
        ))
    }
}

impl Default for DriverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Run configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::unit::UnitTemplate;

/// How many cycles each worker runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleMode {
    /// One cycle per worker, then stop
    #[default]
    Single,
    /// Keep cycling until cancelled
    Repeat,
}

/// Readiness poll settings
///
/// The interval is fixed: every poll waits exactly `poll_interval`
/// regardless of how long the platform takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// Delay between consecutive `get` calls
    pub poll_interval: Duration,

    /// Give up after this long; `None` polls forever
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// Run configuration
///
/// Defines how many workers to start, whether they repeat, how long the run
/// may last and what each cycle creates and executes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of worker slots (one worker per slot)
    pub slots: usize,

    /// Single cycle or repeat until cancelled
    pub mode: CycleMode,

    /// Optional wall-clock budget for the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,

    /// Readiness poll settings
    pub readiness: ReadinessConfig,

    /// Command executed in every ready unit
    pub command: Vec<String>,

    /// Prefix for generated unit names
    pub name_prefix: String,

    /// Template every unit is created from
    pub template: UnitTemplate,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            slots: 1,
            mode: CycleMode::Single,
            duration: None,
            readiness: ReadinessConfig::default(),
            command: vec!["ls".to_string()],
            name_prefix: "podbench".to_string(),
            template: UnitTemplate::default(),
        }
    }
}

impl RunConfig {
    /// Create a new config with the given slot count
    pub fn new(slots: usize) -> Self {
        Self {
            slots,
            ..Default::default()
        }
    }

    /// Set the cycle mode
    pub fn with_mode(mut self, mode: CycleMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the run duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Set the readiness poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.readiness.poll_interval = interval;
        self
    }

    /// Set (or clear) the readiness timeout
    pub fn with_ready_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.readiness.timeout = timeout;
        self
    }

    /// Set the exec command
    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Set the unit name prefix
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Set the unit template
    pub fn with_template(mut self, template: UnitTemplate) -> Self {
        self.template = template;
        self
    }

    /// Validate the configuration
    ///
    /// Zero slots is accepted: the run spawns nothing and reports zeros.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.readiness.poll_interval.is_zero() {
            return Err(ConfigError::InvalidPollInterval(
                "poll interval must be greater than zero".into(),
            ));
        }

        if self.command.is_empty() || self.command.iter().all(|arg| arg.trim().is_empty()) {
            return Err(ConfigError::InvalidCommand("command must not be empty".into()));
        }

        if self.name_prefix.is_empty() {
            return Err(ConfigError::InvalidTemplate("name prefix must not be empty".into()));
        }

        if self.template.image.is_empty() {
            return Err(ConfigError::InvalidTemplate("image must not be empty".into()));
        }

        if self.template.container_name.is_empty() {
            return Err(ConfigError::InvalidTemplate(
                "container name must not be empty".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid poll interval
    #[error("Invalid poll interval: {0}")]
    InvalidPollInterval(String),

    /// Invalid exec command
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Invalid unit template or naming
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),
}

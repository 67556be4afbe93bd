//! Platform collaborator traits
//!
//! The driver talks to the orchestration platform only through these traits.
//! Implementations live in backend crates (`podbench-kube`); tests inject
//! in-memory fakes.

use async_trait::async_trait;

use crate::unit::{UnitPhase, UnitTemplate, WorkUnit};

// ============================================================================
// Platform Error
// ============================================================================

/// Error reported by a platform client
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlatformError {
    /// The addressed unit does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The platform API rejected the request
    #[error("API error ({code}): {message}")]
    Api {
        /// Status code returned by the API
        code: u16,
        /// Error message
        message: String,
    },

    /// Transport-level failure (connection reset, stream closed, etc.)
    #[error("transport error: {0}")]
    Transport(String),

    /// Remote command ran but did not report success
    #[error("command failed ({status}): {message}")]
    CommandFailed {
        /// Reported status (for example "Failure")
        status: String,
        /// Error message from the remote side
        message: String,
    },

    /// Could not obtain an authenticated connection
    #[error("connection error: {0}")]
    Connection(String),

    /// Client misconfiguration
    #[error("configuration error: {0}")]
    Config(String),
}

impl PlatformError {
    /// Check if the addressed unit was missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound(_))
            || matches!(self, PlatformError::Api { code: 404, .. })
    }
}

// ============================================================================
// Connection Provider
// ============================================================================

/// Yields an authenticated handle to the target platform
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Handle type handed to the lifecycle and exec clients
    type Connection: Send;

    /// Resolve credentials and connect
    async fn connect(&self) -> Result<Self::Connection, PlatformError>;
}

// ============================================================================
// Resource Lifecycle
// ============================================================================

/// Observed state of a unit, as returned by [`ResourceLifecycleClient::get`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitStatus {
    /// Phase reported by the platform
    pub phase: UnitPhase,
    /// Optional human-readable reason (waiting reason, failure message)
    pub reason: Option<String>,
}

impl UnitStatus {
    /// Status without a reason
    pub fn new(phase: UnitPhase) -> Self {
        Self {
            phase,
            reason: None,
        }
    }

    /// Attach a reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Create, observe and delete work units
#[async_trait]
pub trait ResourceLifecycleClient: Send + Sync {
    /// Backend identifier (e.g., "kubernetes")
    fn platform_name(&self) -> &str;

    /// Provision a unit named `name` from `template`
    ///
    /// The returned unit starts in [`UnitPhase::Pending`].
    async fn create(&self, name: &str, template: &UnitTemplate)
        -> Result<WorkUnit, PlatformError>;

    /// Observe the current phase of a unit
    async fn get(&self, name: &str) -> Result<UnitStatus, PlatformError>;

    /// Request deletion of a unit
    async fn delete(&self, name: &str) -> Result<(), PlatformError>;
}

// ============================================================================
// Remote Command Executor
// ============================================================================

/// Captured output of a remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Bytes written to stdout
    pub stdout: Vec<u8>,
    /// Bytes written to stderr
    pub stderr: Vec<u8>,
}

/// Run a command inside a running unit
#[async_trait]
pub trait RemoteCommandExecutor: Send + Sync {
    /// Execute `command` in `unit` and wait for it to finish
    ///
    /// Success is reported purely through the returned `Result`.
    async fn exec(&self, unit: &WorkUnit, command: &[String]) -> Result<ExecOutput, PlatformError>;
}

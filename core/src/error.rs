//! Error types for podbench-core
//!
//! Cycle-level failures (a create that was rejected, a unit that never became
//! ready) are not errors at this level: they are recorded as outcomes and
//! counted. `BenchError` covers the conditions that stop a run from starting
//! or completing at all.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a run-level error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchErrorKind {
    /// Configuration failed validation
    Config,
    /// A builder was missing a required component
    MissingConfig,
    /// Could not establish the platform connection
    Connection,
    /// Worker pool could not run to completion
    Orchestration,
    /// Local I/O (report output)
    Io,
    /// Report serialization
    Serialization,
}

impl fmt::Display for BenchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BenchErrorKind::Config => "configuration error",
            BenchErrorKind::MissingConfig => "missing configuration",
            BenchErrorKind::Connection => "connection error",
            BenchErrorKind::Orchestration => "orchestration error",
            BenchErrorKind::Io => "IO error",
            BenchErrorKind::Serialization => "serialization error",
        };
        f.write_str(s)
    }
}

/// Run-level error
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct BenchError {
    /// Error category
    pub kind: BenchErrorKind,
    /// Human-readable detail
    pub message: String,
}

impl BenchError {
    /// Create an error of the given kind
    pub fn new(kind: BenchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Invalid configuration value
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::Config, message)
    }

    /// A required builder field was never set
    pub fn missing_config(field: &str) -> Self {
        Self::new(
            BenchErrorKind::MissingConfig,
            format!("required field `{field}` was not set"),
        )
    }

    /// Platform connection could not be established
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::Connection, message)
    }

    /// Worker pool failure
    pub fn orchestration(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::Orchestration, message)
    }
}

impl From<std::io::Error> for BenchError {
    fn from(err: std::io::Error) -> Self {
        Self::new(BenchErrorKind::Io, err.to_string())
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(BenchErrorKind::Serialization, err.to_string())
    }
}

/// Result type alias
pub type BenchResult<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_names_field() {
        let err = BenchError::missing_config("lifecycle");
        assert_eq!(err.kind, BenchErrorKind::MissingConfig);
        assert!(err.message.contains("lifecycle"));
        assert!(err.to_string().starts_with("missing configuration"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: BenchError = io.into();
        assert_eq!(err.kind, BenchErrorKind::Io);
        assert!(err.message.contains("gone"));
    }
}

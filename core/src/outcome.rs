//! Per-stage outcome events sent from workers to the aggregator

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::unit::UnitPhase;

/// Stage of a lifecycle cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Unit creation
    Create,
    /// Readiness poll
    Ready,
    /// Remote command execution
    Exec,
    /// Cleanup
    Delete,
}

impl Stage {
    /// All stages in cycle order
    pub const ALL: [Stage; 4] = [Stage::Create, Stage::Ready, Stage::Exec, Stage::Delete];

    /// Lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Create => "create",
            Stage::Ready => "ready",
            Stage::Exec => "exec",
            Stage::Delete => "delete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error classification of an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Stage succeeded
    None,
    /// Unit could not be provisioned
    Create,
    /// Unit never reported running within the poll budget
    Readiness,
    /// Remote command failed
    Exec,
    /// Cleanup failed; the unit may leak
    Delete,
}

impl From<Stage> for ErrorKind {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Create => ErrorKind::Create,
            Stage::Ready => ErrorKind::Readiness,
            Stage::Exec => ErrorKind::Exec,
            Stage::Delete => ErrorKind::Delete,
        }
    }
}

/// Result of one stage for one unit
///
/// Built once by the worker that owns the unit and moved into the outcome
/// channel; fields are read-only from then on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleOutcome {
    unit: String,
    worker_id: usize,
    cycle: u64,
    stage: Stage,
    phase: UnitPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    duration: Duration,
    timestamp: chrono::DateTime<chrono::Utc>,
}

impl CycleOutcome {
    /// Successful stage
    pub fn success(
        unit: impl Into<String>,
        worker_id: usize,
        cycle: u64,
        stage: Stage,
        phase: UnitPhase,
        duration: Duration,
    ) -> Self {
        Self {
            unit: unit.into(),
            worker_id,
            cycle,
            stage,
            phase,
            error: None,
            duration,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Failed stage
    pub fn failure(
        unit: impl Into<String>,
        worker_id: usize,
        cycle: u64,
        stage: Stage,
        phase: UnitPhase,
        duration: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::success(unit, worker_id, cycle, stage, phase, duration)
        }
    }

    /// Unit name
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Emitting worker
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Cycle number within the emitting worker
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Stage this outcome reports on
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Phase the unit reached by the end of the stage
    pub fn phase(&self) -> UnitPhase {
        self.phase
    }

    /// Error detail, if the stage failed
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the stage succeeded
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Error classification
    pub fn kind(&self) -> ErrorKind {
        if self.is_success() {
            ErrorKind::None
        } else {
            self.stage.into()
        }
    }

    /// Time spent in the stage
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// When the outcome was recorded
    pub fn timestamp(&self) -> chrono::DateTime<chrono::Utc> {
        self.timestamp
    }
}

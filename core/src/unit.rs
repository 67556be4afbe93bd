//! Work unit identity, template and lifecycle phase

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle phase of a work unit
///
/// Phases only move forward: `Pending -> Running -> Terminating -> Deleted`,
/// with `Failed` reachable from any non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitPhase {
    /// Accepted by the platform, not yet running
    Pending,
    /// Running and eligible for exec
    Running,
    /// Delete requested
    Terminating,
    /// Removed from the platform
    Deleted,
    /// Terminal failure
    Failed,
}

impl UnitPhase {
    fn rank(self) -> u8 {
        match self {
            UnitPhase::Pending => 0,
            UnitPhase::Running => 1,
            UnitPhase::Terminating => 2,
            UnitPhase::Deleted | UnitPhase::Failed => 3,
        }
    }

    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, UnitPhase::Deleted | UnitPhase::Failed)
    }

    /// Whether `self -> next` respects the forward-only ordering
    pub fn can_transition_to(self, next: UnitPhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == UnitPhase::Failed || next.rank() > self.rank()
    }

    /// Lowercase name used in logs and reports
    pub fn as_str(self) -> &'static str {
        match self {
            UnitPhase::Pending => "pending",
            UnitPhase::Running => "running",
            UnitPhase::Terminating => "terminating",
            UnitPhase::Deleted => "deleted",
            UnitPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for UnitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected phase transition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unit {unit}: illegal phase transition {from} -> {to}")]
pub struct PhaseError {
    /// Unit name
    pub unit: String,
    /// Phase before the attempted transition
    pub from: UnitPhase,
    /// Requested phase
    pub to: UnitPhase,
}

/// Desired shape of a work unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTemplate {
    /// Container image
    pub image: String,

    /// Name of the single container; also the exec target
    pub container_name: String,

    /// Execution identity assigned to the unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,

    /// Labels attached to every unit
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl Default for UnitTemplate {
    fn default() -> Self {
        let mut labels = BTreeMap::new();
        labels.insert("app.kubernetes.io/managed-by".to_string(), "podbench".to_string());
        Self {
            image: "nginx:latest".to_string(),
            container_name: "workload".to_string(),
            service_account: None,
            labels,
        }
    }
}

impl UnitTemplate {
    /// Template for the given image with default container name and labels
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    /// Set the execution identity
    pub fn with_service_account(mut self, account: impl Into<String>) -> Self {
        self.service_account = Some(account.into());
        self
    }

    /// Set the container name
    pub fn with_container_name(mut self, name: impl Into<String>) -> Self {
        self.container_name = name.into();
        self
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Name of the unit a worker addresses in a given cycle
///
/// Worker ids are distinct within a run, so two workers never share a name.
pub fn unit_name(prefix: &str, worker_id: usize, cycle: u64) -> String {
    format!("{prefix}-{worker_id}-{cycle}")
}

/// A single short-lived workload, owned by exactly one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    name: String,
    template: UnitTemplate,
    phase: UnitPhase,
}

impl WorkUnit {
    /// A freshly created unit in `Pending`
    pub fn new(name: impl Into<String>, template: UnitTemplate) -> Self {
        Self {
            name: name.into(),
            template,
            phase: UnitPhase::Pending,
        }
    }

    /// Unit name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template the unit was created from
    pub fn template(&self) -> &UnitTemplate {
        &self.template
    }

    /// Current phase
    pub fn phase(&self) -> UnitPhase {
        self.phase
    }

    /// Only a running unit may be exec-targeted
    pub fn is_exec_target(&self) -> bool {
        self.phase == UnitPhase::Running
    }

    /// Move to `next`, rejecting backwards or post-terminal transitions
    pub fn transition(&mut self, next: UnitPhase) -> Result<(), PhaseError> {
        if !self.phase.can_transition_to(next) {
            return Err(PhaseError {
                unit: self.name.clone(),
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }

    /// Mark failed unless already terminal
    pub fn mark_failed(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = UnitPhase::Failed;
        }
    }
}

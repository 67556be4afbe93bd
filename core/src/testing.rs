//! In-memory platform fakes shared by the unit tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::traits::{
    ExecOutput, PlatformError, RemoteCommandExecutor, ResourceLifecycleClient, UnitStatus,
};
use crate::unit::{UnitPhase, UnitTemplate, WorkUnit};

// ============================================================================
// Fake lifecycle client
// ============================================================================

pub(crate) struct FakeLifecycle {
    units: Mutex<HashMap<String, u32>>,
    deleted: Mutex<Vec<String>>,
    pending_polls: u32,
    ready_phase: UnitPhase,
    fail_create: bool,
    fail_get: bool,
    fail_delete: bool,
    created_failed: bool,
    call_delay: Option<Duration>,
    create_calls: AtomicUsize,
    get_calls: AtomicU32,
}

impl FakeLifecycle {
    pub(crate) fn new() -> Self {
        Self {
            units: Mutex::new(HashMap::new()),
            deleted: Mutex::new(Vec::new()),
            pending_polls: 0,
            ready_phase: UnitPhase::Running,
            fail_create: false,
            fail_get: false,
            fail_delete: false,
            created_failed: false,
            call_delay: None,
            create_calls: AtomicUsize::new(0),
            get_calls: AtomicU32::new(0),
        }
    }

    /// Number of `get` calls answered with Pending before the ready phase
    pub(crate) fn with_pending_polls(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Phase reported once the pending polls are used up
    pub(crate) fn with_ready_phase(mut self, phase: UnitPhase) -> Self {
        self.ready_phase = phase;
        self
    }

    pub(crate) fn with_failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub(crate) fn with_failing_get(mut self) -> Self {
        self.fail_get = true;
        self
    }

    pub(crate) fn with_failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    /// Hand back units that are already `Failed` from `create`
    pub(crate) fn with_created_failed(mut self) -> Self {
        self.created_failed = true;
        self
    }

    /// Sleep this long inside every call
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    /// Register a unit without going through `create`
    pub(crate) fn seed(&self, name: &str) {
        self.units
            .lock()
            .unwrap()
            .insert(name.to_string(), self.pending_polls);
    }

    pub(crate) fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn get_calls(&self) -> u32 {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Names passed to `delete`, in call order, including failed deletes
    pub(crate) fn delete_requests(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Units still registered (created and not successfully deleted)
    pub(crate) fn live_units(&self) -> HashSet<String> {
        self.units.lock().unwrap().keys().cloned().collect()
    }

    async fn pause(&self) {
        if let Some(delay) = self.call_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ResourceLifecycleClient for FakeLifecycle {
    fn platform_name(&self) -> &str {
        "fake"
    }

    async fn create(
        &self,
        name: &str,
        template: &UnitTemplate,
    ) -> Result<WorkUnit, PlatformError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if self.fail_create {
            return Err(PlatformError::Api {
                code: 403,
                message: "quota exceeded".to_string(),
            });
        }

        let mut units = self.units.lock().unwrap();
        if units.contains_key(name) {
            return Err(PlatformError::Api {
                code: 409,
                message: format!("{name} already exists"),
            });
        }
        units.insert(name.to_string(), self.pending_polls);
        let mut unit = WorkUnit::new(name, template.clone());
        if self.created_failed {
            unit.mark_failed();
        }
        Ok(unit)
    }

    async fn get(&self, name: &str) -> Result<UnitStatus, PlatformError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if self.fail_get {
            return Err(PlatformError::Transport("connection reset".to_string()));
        }

        let mut units = self.units.lock().unwrap();
        let remaining = units
            .get_mut(name)
            .ok_or_else(|| PlatformError::NotFound(name.to_string()))?;

        if *remaining > 0 {
            *remaining -= 1;
            Ok(UnitStatus::new(UnitPhase::Pending).with_reason("ContainerCreating"))
        } else {
            Ok(UnitStatus::new(self.ready_phase))
        }
    }

    async fn delete(&self, name: &str) -> Result<(), PlatformError> {
        self.deleted.lock().unwrap().push(name.to_string());
        self.pause().await;

        if self.fail_delete {
            return Err(PlatformError::Api {
                code: 500,
                message: "etcd unavailable".to_string(),
            });
        }

        self.units
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| PlatformError::NotFound(name.to_string()))
    }
}

// ============================================================================
// Fake executor
// ============================================================================

pub(crate) struct FakeExecutor {
    fail_first: usize,
    failing_units: HashSet<String>,
    calls: AtomicUsize,
    not_running_targets: AtomicUsize,
    executed: Mutex<Vec<String>>,
}

impl FakeExecutor {
    pub(crate) fn new() -> Self {
        Self {
            fail_first: 0,
            failing_units: HashSet::new(),
            calls: AtomicUsize::new(0),
            not_running_targets: AtomicUsize::new(0),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// The first `n` calls fail, the rest succeed
    pub(crate) fn with_fail_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    /// Every exec against `unit` fails
    pub(crate) fn with_failing_unit(mut self, unit: &str) -> Self {
        self.failing_units.insert(unit.to_string());
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls made against a unit that was not in `Running`
    pub(crate) fn not_running_targets(&self) -> usize {
        self.not_running_targets.load(Ordering::SeqCst)
    }

    pub(crate) fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteCommandExecutor for FakeExecutor {
    async fn exec(&self, unit: &WorkUnit, command: &[String]) -> Result<ExecOutput, PlatformError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !unit.is_exec_target() {
            self.not_running_targets.fetch_add(1, Ordering::SeqCst);
        }
        self.executed.lock().unwrap().push(unit.name().to_string());

        if call < self.fail_first || self.failing_units.contains(unit.name()) {
            return Err(PlatformError::CommandFailed {
                status: "Failure".to_string(),
                message: "command terminated with non-zero exit code: 1".to_string(),
            });
        }

        Ok(ExecOutput {
            stdout: command.join(" ").into_bytes(),
            stderr: Vec::new(),
        })
    }
}

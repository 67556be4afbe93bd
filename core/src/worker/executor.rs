//! Worker cycle loop

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{CycleMode, ReadinessConfig};
use crate::error::BenchResult;
use crate::outcome::{CycleOutcome, Stage};
use crate::traits::{RemoteCommandExecutor, ResourceLifecycleClient};
use crate::unit::{unit_name, UnitPhase, UnitTemplate, WorkUnit};

use super::readiness::wait_until_running;
use super::stats::WorkerStats;

/// Worker runs cycles in a loop: create -> wait ready -> exec -> delete
///
/// Each worker owns the units it creates; names embed the worker id so no two
/// workers ever address the same unit. Outcomes go to the aggregator over an
/// mpsc channel.
pub struct Worker {
    /// Unique worker identifier
    id: usize,

    /// Lifecycle client (shared across workers via Arc)
    lifecycle: Arc<dyn ResourceLifecycleClient>,

    /// Exec client (shared across workers via Arc)
    executor: Arc<dyn RemoteCommandExecutor>,

    /// Channel sender for outcome events
    outcome_tx: mpsc::Sender<CycleOutcome>,

    /// Single cycle or repeat until cancelled
    mode: CycleMode,

    /// Readiness poll settings
    readiness: ReadinessConfig,

    /// Command executed in each ready unit
    command: Vec<String>,

    /// Template for every unit this worker creates
    template: UnitTemplate,

    /// Unit name prefix
    name_prefix: String,
}

impl Worker {
    /// Create a new worker
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        lifecycle: Arc<dyn ResourceLifecycleClient>,
        executor: Arc<dyn RemoteCommandExecutor>,
        outcome_tx: mpsc::Sender<CycleOutcome>,
        mode: CycleMode,
        readiness: ReadinessConfig,
        command: Vec<String>,
        template: UnitTemplate,
        name_prefix: String,
    ) -> Self {
        Self {
            id,
            lifecycle,
            executor,
            outcome_tx,
            mode,
            readiness,
            command,
            template,
            name_prefix,
        }
    }

    /// Run the worker loop
    ///
    /// Cancellation is only checked before a cycle starts. A cycle in flight
    /// always runs through delete, so shutdown waits for at most one cycle
    /// per worker (longer if a platform call hangs).
    pub async fn run(self, cancel: CancellationToken) -> BenchResult<WorkerStats> {
        let mut stats = WorkerStats::new();
        stats.start();

        tracing::debug!(worker_id = self.id, mode = ?self.mode, "Worker started");

        let mut cycle = 0u64;
        loop {
            if cancel.is_cancelled() {
                tracing::debug!(
                    worker_id = self.id,
                    cycles = stats.cycles,
                    "Worker observed cancellation"
                );
                break;
            }

            stats.cycles += 1;
            let delivered = self.run_cycle(cycle, &mut stats).await;
            cycle += 1;

            if !delivered {
                tracing::debug!(worker_id = self.id, "Outcome channel closed, worker stopping");
                break;
            }

            if self.mode == CycleMode::Single {
                break;
            }

            // A cycle whose create fails immediately may never hit an await
            // point that yields.
            tokio::task::yield_now().await;
        }

        stats.stop();
        tracing::debug!(
            worker_id = self.id,
            cycles = stats.cycles,
            failures = stats.failures(),
            elapsed_ms = ?stats.elapsed().map(|d| d.as_millis()),
            "Worker finished"
        );

        Ok(stats)
    }

    /// Run one cycle; returns `false` if the outcome channel was closed
    async fn run_cycle(&self, cycle: u64, stats: &mut WorkerStats) -> bool {
        let name = unit_name(&self.name_prefix, self.id, cycle);
        let mut delivered = true;

        // CREATE
        let started = Instant::now();
        let mut unit = match self.lifecycle.create(&name, &self.template).await {
            Ok(unit) => unit,
            Err(e) => {
                stats.record_failure(Stage::Create);
                tracing::warn!(
                    worker_id = self.id,
                    unit = %name,
                    cycle,
                    error = %e,
                    "Create failed"
                );
                return self
                    .emit(CycleOutcome::failure(
                        name,
                        self.id,
                        cycle,
                        Stage::Create,
                        UnitPhase::Failed,
                        started.elapsed(),
                        e.to_string(),
                    ))
                    .await;
            }
        };
        stats.units_created += 1;
        tracing::info!(worker_id = self.id, unit = %unit.name(), cycle, "Unit created");
        delivered &= self
            .emit(self.success(&unit, cycle, Stage::Create, started))
            .await;

        // WAIT_READY
        let started = Instant::now();
        match wait_until_running(self.lifecycle.as_ref(), unit.name(), &self.readiness).await {
            Ok(_) if !self.advance(&mut unit, UnitPhase::Running) => {
                let error = format!("unit reported running while tracked as {}", unit.phase());
                unit.mark_failed();
                stats.record_failure(Stage::Ready);
                tracing::warn!(
                    worker_id = self.id,
                    unit = %unit.name(),
                    cycle,
                    error = %error,
                    "Unit not exec-ready, skipping exec"
                );
                delivered &= self
                    .emit(self.failure(&unit, cycle, Stage::Ready, started, error))
                    .await;
            }
            Ok(ready) => {
                tracing::info!(
                    worker_id = self.id,
                    unit = %unit.name(),
                    cycle,
                    polls = ready.polls,
                    wait_ms = ready.elapsed.as_millis() as u64,
                    "Unit ready"
                );
                delivered &= self
                    .emit(self.success(&unit, cycle, Stage::Ready, started))
                    .await;

                // EXEC
                delivered &= self.exec(&unit, cycle, stats).await;
            }
            Err(e) => {
                unit.mark_failed();
                stats.record_failure(Stage::Ready);
                tracing::warn!(
                    worker_id = self.id,
                    unit = %unit.name(),
                    cycle,
                    error = %e,
                    "Unit never became ready"
                );
                delivered &= self
                    .emit(self.failure(&unit, cycle, Stage::Ready, started, e.to_string()))
                    .await;
            }
        }

        // DELETE, exactly once for every created unit
        delivered &= self.delete(&mut unit, cycle, stats).await;
        delivered
    }

    async fn exec(&self, unit: &WorkUnit, cycle: u64, stats: &mut WorkerStats) -> bool {
        let started = Instant::now();
        match self.executor.exec(unit, &self.command).await {
            Ok(output) => {
                tracing::info!(
                    worker_id = self.id,
                    unit = %unit.name(),
                    cycle,
                    stdout_bytes = output.stdout.len(),
                    stderr_bytes = output.stderr.len(),
                    "Exec succeeded"
                );
                self.emit(self.success(unit, cycle, Stage::Exec, started))
                    .await
            }
            Err(e) => {
                stats.record_failure(Stage::Exec);
                tracing::warn!(
                    worker_id = self.id,
                    unit = %unit.name(),
                    cycle,
                    error = %e,
                    "Exec failed"
                );
                self.emit(self.failure(unit, cycle, Stage::Exec, started, e.to_string()))
                    .await
            }
        }
    }

    async fn delete(&self, unit: &mut WorkUnit, cycle: u64, stats: &mut WorkerStats) -> bool {
        let started = Instant::now();
        if !unit.phase().is_terminal() {
            self.advance(unit, UnitPhase::Terminating);
        }

        match self.lifecycle.delete(unit.name()).await {
            Ok(()) => {
                if !unit.phase().is_terminal() {
                    self.advance(unit, UnitPhase::Deleted);
                }
                tracing::info!(
                    worker_id = self.id,
                    unit = %unit.name(),
                    cycle,
                    phase = %unit.phase(),
                    "Unit deleted"
                );
                self.emit(self.success(unit, cycle, Stage::Delete, started))
                    .await
            }
            Err(e) => {
                unit.mark_failed();
                stats.record_failure(Stage::Delete);
                tracing::warn!(
                    worker_id = self.id,
                    unit = %unit.name(),
                    cycle,
                    error = %e,
                    "Delete failed, unit may leak"
                );
                self.emit(self.failure(unit, cycle, Stage::Delete, started, e.to_string()))
                    .await
            }
        }
    }

    /// Apply a transition; true when the unit ends up in `next`
    fn advance(&self, unit: &mut WorkUnit, next: UnitPhase) -> bool {
        if let Err(e) = unit.transition(next) {
            tracing::warn!(worker_id = self.id, error = %e, "Phase transition rejected");
        }
        unit.phase() == next
    }

    fn success(&self, unit: &WorkUnit, cycle: u64, stage: Stage, started: Instant) -> CycleOutcome {
        CycleOutcome::success(
            unit.name(),
            self.id,
            cycle,
            stage,
            unit.phase(),
            started.elapsed(),
        )
    }

    fn failure(
        &self,
        unit: &WorkUnit,
        cycle: u64,
        stage: Stage,
        started: Instant,
        error: String,
    ) -> CycleOutcome {
        CycleOutcome::failure(
            unit.name(),
            self.id,
            cycle,
            stage,
            unit.phase(),
            started.elapsed(),
            error,
        )
    }

    /// Send an outcome to the aggregator; `false` if it has gone away
    async fn emit(&self, outcome: CycleOutcome) -> bool {
        self.outcome_tx.send(outcome).await.is_ok()
    }

    /// Get the worker ID
    pub fn id(&self) -> usize {
        self.id
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("platform", &self.lifecycle.platform_name())
            .field("mode", &self.mode)
            .field("readiness", &self.readiness)
            .field("command", &self.command)
            .finish()
    }
}

//! Workload driver execution logic

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::channel::ChannelConfig;
use crate::config::RunConfig;
use crate::error::{BenchError, BenchResult};
use crate::report::RunReport;
use crate::shutdown::{ShutdownCoordinator, ShutdownReason};
use crate::traits::{RemoteCommandExecutor, ResourceLifecycleClient};
use crate::worker::{WorkerBuilder, WorkerStats};

use super::aggregator::{AggregateStats, ResultAggregator};

/// What a finished run hands back
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Counters from the aggregator
    pub stats: AggregateStats,
    /// Per-worker bookkeeping, one entry per worker that returned cleanly
    pub workers: Vec<WorkerStats>,
    /// Wall-clock time when workers were spawned
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// Time from spawning the first worker to the aggregator finishing
    pub elapsed: Duration,
}

impl RunOutcome {
    /// Sum of all worker bookkeeping
    pub fn worker_totals(&self) -> WorkerStats {
        self.workers.iter().fold(WorkerStats::new(), |mut acc, w| {
            acc.merge(w);
            acc
        })
    }
}

/// Runs one worker per slot against the injected platform clients
///
/// Workers share nothing but the clients and the outcome channel; the
/// aggregator is the only reader of that channel.
pub struct WorkloadDriver {
    pub(crate) config: RunConfig,
    pub(crate) lifecycle: Arc<dyn ResourceLifecycleClient>,
    pub(crate) executor: Arc<dyn RemoteCommandExecutor>,
    pub(crate) channel_config: ChannelConfig,
}

impl WorkloadDriver {
    /// Create a new driver
    ///
    /// Use `DriverBuilder` to get validation on construction.
    pub fn new(
        config: RunConfig,
        lifecycle: Arc<dyn ResourceLifecycleClient>,
        executor: Arc<dyn RemoteCommandExecutor>,
        channel_config: ChannelConfig,
    ) -> Self {
        Self {
            config,
            lifecycle,
            executor,
            channel_config,
        }
    }

    /// Get the run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Spawn the workers and wait for them and the aggregator to finish
    ///
    /// Returns once every worker has stopped and every outcome has been
    /// counted. A worker that errors or panics is logged and the others
    /// carry on; the run only fails if every worker failed.
    pub async fn run(&self, cancel: CancellationToken) -> BenchResult<RunOutcome> {
        let slots = self.config.slots;
        let started_at = chrono::Utc::now();
        let start = Instant::now();

        tracing::info!(
            platform = self.lifecycle.platform_name(),
            slots,
            mode = ?self.config.mode,
            command = ?self.config.command,
            "Starting run"
        );

        let (outcome_tx, outcome_rx) = mpsc::channel(self.channel_config.outcome_buffer);

        // Nothing is spawned until every worker has been built.
        let built = (0..slots)
            .map(|worker_id| {
                WorkerBuilder::new(worker_id)
                    .run_config(&self.config)
                    .lifecycle(Arc::clone(&self.lifecycle))
                    .executor(Arc::clone(&self.executor))
                    .outcome_tx(outcome_tx.clone())
                    .build()
            })
            .collect::<BenchResult<Vec<_>>>()?;

        // The aggregator stops once the last worker's sender is gone.
        drop(outcome_tx);

        let aggregator = tokio::spawn(ResultAggregator::new().consume(outcome_rx, cancel.clone()));
        let handles: Vec<_> = built
            .into_iter()
            .map(|worker| tokio::spawn(worker.run(cancel.clone())))
            .collect();

        let mut workers = Vec::with_capacity(handles.len());
        let mut worker_failures = 0;
        for (idx, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(Ok(stats)) => {
                    tracing::debug!(
                        worker_id = idx,
                        cycles = stats.cycles,
                        failures = stats.failures(),
                        "Worker completed"
                    );
                    workers.push(stats);
                }
                Ok(Err(e)) => {
                    worker_failures += 1;
                    tracing::error!(worker_id = idx, error = %e, "Worker returned error");
                }
                Err(e) => {
                    worker_failures += 1;
                    tracing::error!(worker_id = idx, error = %e, "Worker task panicked");
                }
            }
        }

        let stats = aggregator
            .await
            .map_err(|e| BenchError::orchestration(format!("aggregator task failed: {e}")))?;
        let elapsed = start.elapsed();

        if workers.is_empty() && worker_failures > 0 {
            return Err(BenchError::orchestration(format!(
                "All {} workers failed to complete",
                worker_failures
            )));
        }

        tracing::info!(
            elapsed_secs = elapsed.as_secs_f64(),
            created = stats.created,
            exec_attempted = stats.exec_attempted,
            exec_succeeded = stats.exec_succeeded,
            deleted = stats.deleted,
            success_rate = stats.success_rate(),
            "Run completed"
        );

        Ok(RunOutcome {
            stats,
            workers,
            started_at,
            elapsed,
        })
    }

    /// Run under a shutdown coordinator and build the final report
    pub async fn run_with_shutdown(&self, shutdown: &ShutdownCoordinator) -> BenchResult<RunReport> {
        let outcome = self.run(shutdown.token()).await?;
        Ok(self.report(outcome, shutdown.reason()))
    }

    /// Build the report for a finished run
    pub fn report(
        &self,
        outcome: RunOutcome,
        stopped_by: Option<ShutdownReason>,
    ) -> RunReport {
        RunReport {
            platform: self.lifecycle.platform_name().to_string(),
            slots: self.config.slots,
            mode: self.config.mode,
            stopped_by,
            started_at: outcome.started_at,
            finished_at: chrono::Utc::now(),
            elapsed_secs: outcome.elapsed.as_secs_f64(),
            stats: outcome.stats,
        }
    }
}

impl std::fmt::Debug for WorkloadDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkloadDriver")
            .field("config", &self.config)
            .field("platform", &self.lifecycle.platform_name())
            .field("channel_config", &self.channel_config)
            .finish()
    }
}

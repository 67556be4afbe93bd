//! Outcome aggregation
//!
//! A single [`ResultAggregator`] drains the outcome channel that every worker
//! writes to. It is the only code that touches the counters, so no counter is
//! ever shared between tasks.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::outcome::{CycleOutcome, Stage};

/// Latency summary for one stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    /// Outcomes recorded for the stage (success or failure)
    pub count: u64,
    /// Sum of stage durations in milliseconds
    pub total_ms: f64,
    /// Slowest stage duration in milliseconds
    pub max_ms: f64,
}

impl StageTiming {
    fn record(&mut self, duration: Duration) {
        let ms = duration.as_secs_f64() * 1000.0;
        self.count += 1;
        self.total_ms += ms;
        if ms > self.max_ms {
            self.max_ms = ms;
        }
    }

    /// Mean duration in milliseconds (0 with no samples)
    pub fn mean_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms / self.count as f64
        }
    }
}

/// Per-stage latency summaries
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    /// Create calls
    pub create: StageTiming,
    /// Readiness waits
    pub ready: StageTiming,
    /// Exec calls
    pub exec: StageTiming,
    /// Delete calls
    pub delete: StageTiming,
}

impl StageTimings {
    /// Timing for `stage`
    pub fn get(&self, stage: Stage) -> &StageTiming {
        match stage {
            Stage::Create => &self.create,
            Stage::Ready => &self.ready,
            Stage::Exec => &self.exec,
            Stage::Delete => &self.delete,
        }
    }

    fn get_mut(&mut self, stage: Stage) -> &mut StageTiming {
        match stage {
            Stage::Create => &mut self.create,
            Stage::Ready => &mut self.ready,
            Stage::Exec => &mut self.exec,
            Stage::Delete => &mut self.delete,
        }
    }
}

/// Counters for a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Units successfully created
    pub created: u64,
    /// Creates that failed
    pub create_failed: u64,
    /// Units that reached running
    pub ready: u64,
    /// Units that never reached running
    pub readiness_failed: u64,
    /// Exec calls made
    pub exec_attempted: u64,
    /// Exec calls that succeeded
    pub exec_succeeded: u64,
    /// Exec calls that failed
    pub exec_failed: u64,
    /// Units successfully deleted
    pub deleted: u64,
    /// Deletes that failed (possible leaks)
    pub delete_failed: u64,
    /// Per-stage latency
    pub timings: StageTimings,
}

impl AggregateStats {
    /// Exec success as a whole percentage, rounded down
    ///
    /// Returns 0 when no exec was attempted.
    pub fn success_rate(&self) -> u64 {
        if self.exec_attempted == 0 {
            0
        } else {
            self.exec_succeeded * 100 / self.exec_attempted
        }
    }

    /// Exec success ratio (0.0 - 1.0)
    pub fn success_ratio(&self) -> f64 {
        if self.exec_attempted == 0 {
            0.0
        } else {
            self.exec_succeeded as f64 / self.exec_attempted as f64
        }
    }

    /// Create attempts (successful or not)
    pub fn cycles_started(&self) -> u64 {
        self.created + self.create_failed
    }

    /// Created units whose delete failed or was never attempted
    pub fn possibly_leaked(&self) -> u64 {
        self.created.saturating_sub(self.deleted)
    }

    fn record(&mut self, outcome: &CycleOutcome) {
        let ok = outcome.is_success();
        match outcome.stage() {
            Stage::Create if ok => self.created += 1,
            Stage::Create => self.create_failed += 1,
            Stage::Ready if ok => self.ready += 1,
            Stage::Ready => self.readiness_failed += 1,
            Stage::Exec => {
                self.exec_attempted += 1;
                if ok {
                    self.exec_succeeded += 1;
                } else {
                    self.exec_failed += 1;
                }
            }
            Stage::Delete if ok => self.deleted += 1,
            Stage::Delete => self.delete_failed += 1,
        }
        self.timings.get_mut(outcome.stage()).record(outcome.duration());
    }
}

/// Single consumer of the outcome channel
#[derive(Debug, Default)]
pub struct ResultAggregator {
    stats: AggregateStats,
    consumed: u64,
}

impl ResultAggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one outcome into the counters
    pub fn record(&mut self, outcome: CycleOutcome) {
        self.stats.record(&outcome);
        self.consumed += 1;
    }

    /// Outcomes consumed so far
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Current counters
    pub fn stats(&self) -> &AggregateStats {
        &self.stats
    }

    /// Drain `rx` until every sender is dropped, then finalize
    ///
    /// Cancellation is only logged: workers finish their in-flight cycles
    /// after cancellation and those outcomes still have to be counted.
    pub async fn consume(
        mut self,
        mut rx: mpsc::Receiver<CycleOutcome>,
        cancel: CancellationToken,
    ) -> AggregateStats {
        let mut cancel_seen = false;

        loop {
            tokio::select! {
                biased;

                outcome = rx.recv() => match outcome {
                    Some(outcome) => self.record(outcome),
                    None => break,
                },

                _ = cancel.cancelled(), if !cancel_seen => {
                    cancel_seen = true;
                    tracing::info!(
                        consumed = self.consumed,
                        "Cancellation observed, draining outstanding outcomes"
                    );
                }
            }
        }

        self.finish()
    }

    /// Finalize and hand back the counters
    pub fn finish(self) -> AggregateStats {
        tracing::debug!(
            consumed = self.consumed,
            created = self.stats.created,
            exec_attempted = self.stats.exec_attempted,
            deleted = self.stats.deleted,
            success_rate = self.stats.success_rate(),
            "Aggregation finished"
        );
        self.stats
    }
}

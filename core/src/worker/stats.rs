//! Worker statistics tracking

use std::time::{Duration, Instant};

use crate::outcome::Stage;

/// Statistics tracked by each worker
///
/// These are the worker's own bookkeeping, returned when it stops. The run's
/// authoritative counters come from the aggregator.
#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    /// Cycles started
    pub cycles: u64,

    /// Units successfully created
    pub units_created: u64,

    /// Cycles aborted at create
    pub create_failures: u64,

    /// Units that never became ready
    pub readiness_failures: u64,

    /// Failed execs
    pub exec_failures: u64,

    /// Failed deletes
    pub delete_failures: u64,

    /// Worker start time
    pub started_at: Option<Instant>,

    /// Worker end time
    pub ended_at: Option<Instant>,
}

impl WorkerStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the worker as started
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
        self.ended_at = None;
    }

    /// Mark the worker as finished
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Record a failed stage
    pub fn record_failure(&mut self, stage: Stage) {
        match stage {
            Stage::Create => self.create_failures += 1,
            Stage::Ready => self.readiness_failures += 1,
            Stage::Exec => self.exec_failures += 1,
            Stage::Delete => self.delete_failures += 1,
        }
    }

    /// Total failed stages across all cycles
    pub fn failures(&self) -> u64 {
        self.create_failures + self.readiness_failures + self.exec_failures + self.delete_failures
    }

    /// Time between start and stop, or since start while still running
    pub fn elapsed(&self) -> Option<Duration> {
        let start = self.started_at?;
        let end = self.ended_at.unwrap_or_else(Instant::now);
        Some(end.saturating_duration_since(start))
    }

    /// Cycles started per second of worker lifetime
    pub fn cycles_per_second(&self) -> f64 {
        match self.elapsed() {
            Some(d) if !d.is_zero() => self.cycles as f64 / d.as_secs_f64(),
            _ => 0.0,
        }
    }

    /// Merge counters from another worker
    pub fn merge(&mut self, other: &WorkerStats) {
        self.cycles += other.cycles;
        self.units_created += other.units_created;
        self.create_failures += other.create_failures;
        self.readiness_failures += other.readiness_failures;
        self.exec_failures += other.exec_failures;
        self.delete_failures += other.delete_failures;
    }
}

//! End-of-run report

use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::CycleMode;
use crate::driver::AggregateStats;
use crate::error::BenchResult;
use crate::outcome::Stage;
use crate::shutdown::ShutdownReason;

/// Final report for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Platform the run targeted
    pub platform: String,
    /// Worker slots requested
    pub slots: usize,
    /// Cycle mode
    pub mode: CycleMode,
    /// Why the run stopped; `None` when every worker finished on its own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_by: Option<ShutdownReason>,
    /// When the first worker was spawned
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// When the last outcome was consumed
    pub finished_at: chrono::DateTime<chrono::Utc>,
    /// Wall-clock run time in seconds
    pub elapsed_secs: f64,
    /// Aggregated counters
    pub stats: AggregateStats,
}

impl RunReport {
    /// Units created per second of wall-clock time
    pub fn units_per_second(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.stats.created as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    /// Wall-clock run time
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed_secs.max(0.0))
    }

    /// Write the report as pretty-printed JSON
    pub fn write_json(&self, path: impl AsRef<Path>) -> BenchResult<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.stats;
        let mode = match self.mode {
            CycleMode::Single => "single",
            CycleMode::Repeat => "repeat",
        };
        let stopped_by = self
            .stopped_by
            .map(|r| r.to_string())
            .unwrap_or_else(|| "completed".to_string());

        writeln!(f, "podbench report ({})", self.platform)?;
        writeln!(f, "  workers:         {} ({mode})", self.slots)?;
        writeln!(f, "  elapsed:         {:.2}s", self.elapsed_secs)?;
        writeln!(f, "  stopped by:      {stopped_by}")?;
        writeln!(f, "  created:         {} (create failures: {})", s.created, s.create_failed)?;
        writeln!(f, "  ready:           {} (readiness failures: {})", s.ready, s.readiness_failed)?;
        writeln!(f, "  exec attempted:  {}", s.exec_attempted)?;
        writeln!(f, "  exec succeeded:  {}", s.exec_succeeded)?;
        writeln!(f, "  exec failed:     {}", s.exec_failed)?;
        writeln!(f, "  deleted:         {} (delete failures: {})", s.deleted, s.delete_failed)?;
        writeln!(f, "  success rate:    {}%", s.success_rate())?;
        writeln!(f, "  throughput:      {:.2} units/s", self.units_per_second())?;
        if s.possibly_leaked() > 0 {
            writeln!(f, "  possibly leaked: {}", s.possibly_leaked())?;
        }
        writeln!(f, "  stage latency (mean / max ms):")?;
        for stage in Stage::ALL {
            let t = s.timings.get(stage);
            writeln!(
                f,
                "    {:<8} {:>9.1} / {:>9.1}  (n={})",
                stage.as_str(),
                t.mean_ms(),
                t.max_ms,
                t.count
            )?;
        }
        Ok(())
    }
}

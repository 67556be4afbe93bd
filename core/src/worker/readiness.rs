//! Fixed-interval readiness polling

use std::time::{Duration, Instant};

use crate::config::ReadinessConfig;
use crate::traits::{PlatformError, ResourceLifecycleClient};
use crate::unit::UnitPhase;

/// Why a unit never became ready
#[derive(Debug, thiserror::Error)]
pub enum ReadinessError {
    /// Poll budget exhausted
    #[error("not running after {elapsed:?} ({polls} polls)")]
    Timeout {
        /// Time spent polling
        elapsed: Duration,
        /// Number of `get` calls made
        polls: u32,
    },

    /// The platform reported a phase the unit cannot recover from
    #[error("unit reported {phase}{}", reason_suffix(.reason))]
    Terminated {
        /// Phase reported by the platform
        phase: UnitPhase,
        /// Platform-supplied reason
        reason: Option<String>,
    },

    /// `get` failed
    #[error("status check failed: {0}")]
    Get(#[from] PlatformError),
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default()
}

/// Successful wait
#[derive(Debug, Clone, Copy)]
pub struct Ready {
    /// Number of `get` calls made
    pub polls: u32,
    /// Time spent polling
    pub elapsed: Duration,
}

/// Poll `get` every `config.poll_interval` until the unit is running
///
/// The interval never grows. The loop does not observe cancellation: once a
/// worker starts waiting it waits until ready, failed or timed out.
pub async fn wait_until_running(
    lifecycle: &dyn ResourceLifecycleClient,
    name: &str,
    config: &ReadinessConfig,
) -> Result<Ready, ReadinessError> {
    let start = Instant::now();
    let mut polls = 0u32;

    loop {
        polls += 1;
        let status = lifecycle.get(name).await?;

        match status.phase {
            UnitPhase::Running => {
                return Ok(Ready {
                    polls,
                    elapsed: start.elapsed(),
                });
            }
            UnitPhase::Pending => {
                tracing::trace!(
                    unit = name,
                    polls,
                    reason = status.reason.as_deref(),
                    "Unit not ready yet"
                );
            }
            phase => {
                return Err(ReadinessError::Terminated {
                    phase,
                    reason: status.reason,
                });
            }
        }

        if let Some(timeout) = config.timeout {
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(ReadinessError::Timeout { elapsed, polls });
            }
        }

        tokio::time::sleep(config.poll_interval).await;
    }
}

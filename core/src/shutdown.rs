//! Shutdown coordination
//!
//! Merges the OS interrupt and an optional run deadline into a single
//! [`CancellationToken`] shared by every worker and the aggregator. The first
//! source to fire wins; later triggers are no-ops.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Why the run was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownReason {
    /// Ctrl-C or SIGTERM
    Interrupt,
    /// The configured run duration elapsed
    Deadline,
    /// Cancelled programmatically
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShutdownReason::Interrupt => "interrupt",
            ShutdownReason::Deadline => "deadline",
            ShutdownReason::Requested => "requested",
        })
    }
}

/// Owns the run's cancellation token and the task that watches the signal
/// sources. Dropping the coordinator stops the watcher but does not cancel.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    reason: Arc<OnceLock<ShutdownReason>>,
    watcher: JoinHandle<()>,
}

impl ShutdownCoordinator {
    /// Watch Ctrl-C (and SIGTERM on unix) plus the optional deadline
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(deadline: Option<Duration>) -> Self {
        Self::start_with_interrupt(deadline, wait_for_interrupt().boxed())
    }

    /// Like [`start`](Self::start), with a caller-supplied interrupt source
    pub fn start_with_interrupt(
        deadline: Option<Duration>,
        interrupt: BoxFuture<'static, ()>,
    ) -> Self {
        let token = CancellationToken::new();
        let reason = Arc::new(OnceLock::new());
        let watcher = tokio::spawn(watch(token.clone(), Arc::clone(&reason), deadline, interrupt));

        Self {
            token,
            reason,
            watcher,
        }
    }

    /// Token observed by workers and the aggregator
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancel the run
    ///
    /// Returns `true` if this call was the one that cancelled.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        cancel_once(&self.token, &self.reason, reason)
    }

    /// Whether cancellation has been broadcast
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Reason recorded by the first trigger, if any
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }
}

impl Drop for ShutdownCoordinator {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

impl fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("cancelled", &self.token.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

fn cancel_once(
    token: &CancellationToken,
    slot: &OnceLock<ShutdownReason>,
    reason: ShutdownReason,
) -> bool {
    let first = slot.set(reason).is_ok();
    token.cancel();
    first
}

async fn watch(
    token: CancellationToken,
    reason: Arc<OnceLock<ShutdownReason>>,
    deadline: Option<Duration>,
    interrupt: BoxFuture<'static, ()>,
) {
    let deadline_elapsed = async move {
        match deadline {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = interrupt => {
            tracing::info!("Received interrupt, initiating graceful shutdown...");
            cancel_once(&token, &reason, ShutdownReason::Interrupt);
        }
        _ = deadline_elapsed => {
            tracing::info!(
                deadline_secs = deadline.map(|d| d.as_secs_f64()),
                "Run deadline reached, initiating shutdown..."
            );
            cancel_once(&token, &reason, ShutdownReason::Deadline);
        }
        _ = token.cancelled() => {
            cancel_once(&token, &reason, ShutdownReason::Requested);
            tracing::debug!("Shutdown token cancelled elsewhere");
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
///
/// If a handler cannot be installed the error is logged and that source never
/// fires.
pub async fn wait_for_interrupt() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = term.recv() => {
                        tracing::info!("Received SIGTERM");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

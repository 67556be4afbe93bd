//! Workload driver for running a benchmark
//!
//! The driver coordinates one complete run:
//! - Spawning one worker task per slot
//! - Sharing a single cancellation token with every worker
//! - Funnelling every cycle outcome into one aggregator
//! - Joining workers and reporting per-worker failures
//!
//! # Example
//!
//! ```ignore
//! use podbench_core::{DriverBuilder, ShutdownCoordinator};
//!
//! let driver = DriverBuilder::new()
//!     .slots(10)
//!     .lifecycle(lifecycle)
//!     .executor(executor)
//!     .build()?;
//!
//! let shutdown = ShutdownCoordinator::start(Some(Duration::from_secs(60)));
//! let report = driver.run_with_shutdown(&shutdown).await?;
//! println!("{report}");
//! ```

pub mod aggregator;
mod builder;
mod executor;

pub use aggregator::{AggregateStats, ResultAggregator, StageTiming, StageTimings};
pub use builder::DriverBuilder;
pub use executor::{RunOutcome, WorkloadDriver};

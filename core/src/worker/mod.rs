//! Worker module for running lifecycle cycles
//!
//! The Worker is the unit of load in podbench. Each worker is a tokio task
//! that owns one unit at a time and walks it through a fixed cycle:
//!
//! 1. Create the unit from the template
//! 2. Poll until it reports running (fixed interval, optional timeout)
//! 3. Execute the configured command inside it
//! 4. Delete it, whatever happened in steps 2 and 3
//! 5. Repeat with a fresh unit name until cancelled (repeat mode only)
//!
//! Every stage produces one [`CycleOutcome`](crate::outcome::CycleOutcome)
//! sent to the aggregator. Workers share nothing but the platform clients and
//! the outcome channel.
//!
//! # Example
//!
//! ```ignore
//! use podbench_core::worker::WorkerBuilder;
//! use podbench_core::CycleMode;
//!
//! let worker = WorkerBuilder::new(0)
//!     .lifecycle(lifecycle)
//!     .executor(executor)
//!     .outcome_tx(tx)
//!     .mode(CycleMode::Single)
//!     .build()?;
//!
//! let stats = worker.run(cancel_token).await?;
//! println!("Cycles: {}", stats.cycles);
//! ```

mod builder;
mod executor;
pub mod readiness;
mod stats;

pub use builder::WorkerBuilder;
pub use executor::Worker;
pub use readiness::{wait_until_running, ReadinessError};
pub use stats::WorkerStats;

#[cfg(test)]
mod tests;

//! podbench-core: Concurrent lifecycle load driver
//!
//! This crate holds everything podbench needs that does not talk to a real
//! cluster:
//!
//! - Work unit model and phase machine
//! - Platform traits (connection, lifecycle, remote exec)
//! - Workers, the workload driver and the outcome aggregator
//! - Shutdown coordination and the final report
//! - Error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod driver;
pub mod error;
pub mod outcome;
pub mod report;
pub mod shutdown;
pub mod traits;
pub mod unit;
pub mod worker;

#[cfg(test)]
mod testing;

pub use channel::ChannelConfig;
pub use config::{ConfigError, CycleMode, ReadinessConfig, RunConfig};
pub use driver::{AggregateStats, DriverBuilder, ResultAggregator, RunOutcome, WorkloadDriver};
pub use error::*;
pub use outcome::{CycleOutcome, ErrorKind, Stage};
pub use report::RunReport;
pub use shutdown::{wait_for_interrupt, ShutdownCoordinator, ShutdownReason};
pub use traits::*;
pub use unit::{unit_name, PhaseError, UnitPhase, UnitTemplate, WorkUnit};
pub use worker::{Worker, WorkerBuilder, WorkerStats};

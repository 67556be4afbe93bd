//! Kubernetes backend for podbench
//!
//! This crate implements the podbench-core platform traits on top of `kube`:
//!
//! - [`KubeConnector`]: in-cluster or kubeconfig credentials
//! - [`PodLifecycleClient`]: create, get and delete pods
//! - [`PodExecutor`]: run a command in a pod's container

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connection;
mod error;
pub mod exec;
pub mod pods;

pub use connection::KubeConnector;
pub use exec::PodExecutor;
pub use pods::PodLifecycleClient;

/// Platform name reported by the Kubernetes clients
pub const PLATFORM_NAME: &str = "kubernetes";

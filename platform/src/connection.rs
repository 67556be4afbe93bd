//! Credential discovery and client construction

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use podbench_core::{ConnectionProvider, PlatformError};

/// Environment variable that marks a process running inside a cluster
pub const IN_CLUSTER_ENV: &str = "KUBERNETES_SERVICE_HOST";

/// Where credentials come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Service account mounted into the pod
    InCluster,
    /// A specific kubeconfig file
    Kubeconfig(PathBuf),
    /// Whatever `kube` infers from its own defaults
    Default,
}

/// Builds a [`kube::Client`] from in-cluster or kubeconfig credentials
#[derive(Debug, Clone, Default)]
pub struct KubeConnector {
    kubeconfig: Option<PathBuf>,
}

impl KubeConnector {
    /// Connector that discovers credentials on its own
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this kubeconfig when running outside a cluster
    ///
    /// The path may be a `KUBECONFIG`-style list; the files are merged with
    /// the first one taking precedence.
    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Credential source for the current environment
    pub fn credential_source(&self) -> CredentialSource {
        resolve_source(
            std::env::var_os(IN_CLUSTER_ENV).is_some(),
            self.kubeconfig.as_deref(),
            std::env::var_os("HOME").map(PathBuf::from).as_deref(),
        )
    }

    async fn config(&self) -> Result<Config, PlatformError> {
        let options = KubeConfigOptions::default();
        match self.credential_source() {
            CredentialSource::InCluster => {
                tracing::info!("Inside cluster, using in-cluster configuration");
                Config::incluster().map_err(|e| PlatformError::Config(e.to_string()))
            }
            CredentialSource::Kubeconfig(path) => {
                tracing::info!(kubeconfig = %path.display(), "Outside cluster, using kubeconfig");
                let kubeconfig = load_kubeconfig(&path)?;
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(|e| PlatformError::Config(e.to_string()))
            }
            CredentialSource::Default => {
                tracing::info!("Outside cluster, using default kubeconfig resolution");
                Config::from_kubeconfig(&options)
                    .await
                    .map_err(|e| PlatformError::Config(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl ConnectionProvider for KubeConnector {
    type Connection = Client;

    async fn connect(&self) -> Result<Client, PlatformError> {
        let config = self.config().await?;
        let client =
            Client::try_from(config).map_err(|e| PlatformError::Connection(e.to_string()))?;

        let version = client
            .apiserver_version()
            .await
            .map_err(|e| PlatformError::Connection(e.to_string()))?;
        tracing::info!(
            server_version = %version.git_version,
            platform = %version.platform,
            "Connected to API server"
        );

        Ok(client)
    }
}

/// Read and merge every file named in a path list
fn load_kubeconfig(paths: &Path) -> Result<Kubeconfig, PlatformError> {
    let mut merged: Option<Kubeconfig> = None;
    for path in std::env::split_paths(paths) {
        if path.as_os_str().is_empty() {
            continue;
        }
        let next = Kubeconfig::read_from(&path)
            .map_err(|e| PlatformError::Config(format!("{}: {e}", path.display())))?;
        merged = Some(match merged {
            Some(current) => current
                .merge(next)
                .map_err(|e| PlatformError::Config(format!("{}: {e}", path.display())))?,
            None => next,
        });
    }
    merged.ok_or_else(|| {
        PlatformError::Config(format!("{}: no kubeconfig files listed", paths.display()))
    })
}

/// Pick the credential source
///
/// In-cluster wins, then an explicit kubeconfig, then `$HOME/.kube/config`
/// if it exists.
fn resolve_source(in_cluster: bool, explicit: Option<&Path>, home: Option<&Path>) -> CredentialSource {
    if in_cluster {
        return CredentialSource::InCluster;
    }
    if let Some(path) = explicit {
        return CredentialSource::Kubeconfig(path.to_path_buf());
    }
    match home.map(|h| h.join(".kube").join("config")) {
        Some(path) if path.is_file() => CredentialSource::Kubeconfig(path),
        _ => CredentialSource::Default,
    }
}

//! Remote command execution in pods

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use kube::api::{Api, AttachParams};
use kube::Client;
use podbench_core::{ExecOutput, PlatformError, RemoteCommandExecutor, WorkUnit};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::platform_error;

/// Runs commands in the unit's container over the exec subresource
#[derive(Clone)]
pub struct PodExecutor {
    api: Api<Pod>,
}

impl PodExecutor {
    /// Executor for pods in `namespace`
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
        }
    }
}

impl std::fmt::Debug for PodExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PodExecutor").finish_non_exhaustive()
    }
}

#[async_trait]
impl RemoteCommandExecutor for PodExecutor {
    async fn exec(&self, unit: &WorkUnit, command: &[String]) -> Result<ExecOutput, PlatformError> {
        let params = AttachParams::default()
            .container(unit.template().container_name.clone())
            .stdin(false)
            .stdout(true)
            .stderr(true);

        let mut attached = self
            .api
            .exec(unit.name(), command.iter().cloned(), &params)
            .await
            .map_err(platform_error)?;

        let stdout = attached.stdout();
        let stderr = attached.stderr();
        let status = attached.take_status();

        let (stdout, stderr) = tokio::join!(read_all(stdout), read_all(stderr));
        let status = match status {
            Some(status) => status.await,
            None => None,
        };

        attached
            .join()
            .await
            .map_err(|e| PlatformError::Transport(e.to_string()))?;

        exec_result(
            status,
            stdout.map_err(|e| PlatformError::Transport(e.to_string()))?,
            stderr.map_err(|e| PlatformError::Transport(e.to_string()))?,
        )
    }
}

async fn read_all(reader: Option<impl AsyncRead + Unpin>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Turn the exec status frame into a result
///
/// Only an explicit `Success` status counts; a missing status means the
/// stream closed before the command finished.
pub(crate) fn exec_result(
    status: Option<Status>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
) -> Result<ExecOutput, PlatformError> {
    let status = status.ok_or_else(|| {
        PlatformError::Transport("exec stream closed without a status".to_string())
    })?;

    match status.status.as_deref() {
        Some("Success") => Ok(ExecOutput { stdout, stderr }),
        other => Err(PlatformError::CommandFailed {
            status: other.unwrap_or("Unknown").to_string(),
            message: status.message.unwrap_or_default(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(value: &str, message: Option<&str>) -> Status {
        Status {
            status: Some(value.to_string()),
            message: message.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_success_keeps_output() {
        let output = exec_result(
            Some(status("Success", None)),
            b"bin\netc\n".to_vec(),
            Vec::new(),
        )
        .unwrap();
        assert_eq!(output.stdout, b"bin\netc\n");
        assert!(output.stderr.is_empty());
    }

    #[test]
    fn test_failure_status() {
        let err = exec_result(
            Some(status(
                "Failure",
                Some("command terminated with non-zero exit code: 2"),
            )),
            Vec::new(),
            b"ls: nope\n".to_vec(),
        )
        .unwrap_err();

        match err {
            PlatformError::CommandFailed { status, message } => {
                assert_eq!(status, "Failure");
                assert!(message.contains("exit code: 2"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_status_is_transport_error() {
        let err = exec_result(None, Vec::new(), Vec::new()).unwrap_err();
        assert!(matches!(err, PlatformError::Transport(_)));
    }

    #[test]
    fn test_status_without_value() {
        let err = exec_result(Some(Status::default()), Vec::new(), Vec::new()).unwrap_err();
        assert!(matches!(err, PlatformError::CommandFailed { ref status, .. } if status == "Unknown"));
    }
}

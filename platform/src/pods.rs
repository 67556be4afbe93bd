//! Pod lifecycle client

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use kube::api::{Api, DeleteParams, ObjectMeta, PostParams};
use kube::Client;
use podbench_core::{
    PlatformError, ResourceLifecycleClient, UnitPhase, UnitStatus, UnitTemplate, WorkUnit,
};

use crate::error::platform_error;
use crate::PLATFORM_NAME;

/// Creates, observes and deletes pods in one namespace
#[derive(Clone)]
pub struct PodLifecycleClient {
    api: Api<Pod>,
    namespace: String,
}

impl PodLifecycleClient {
    /// Client for pods in `namespace`
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            api: Api::namespaced(client, &namespace),
            namespace,
        }
    }

    /// Target namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl std::fmt::Debug for PodLifecycleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PodLifecycleClient")
            .field("namespace", &self.namespace)
            .finish()
    }
}

#[async_trait]
impl ResourceLifecycleClient for PodLifecycleClient {
    fn platform_name(&self) -> &str {
        PLATFORM_NAME
    }

    async fn create(&self, name: &str, template: &UnitTemplate) -> Result<WorkUnit, PlatformError> {
        let pod = pod_manifest(name, template);
        self.api
            .create(&PostParams::default(), &pod)
            .await
            .map_err(platform_error)?;

        tracing::debug!(unit = name, namespace = %self.namespace, image = %template.image, "Pod created");
        Ok(WorkUnit::new(name, template.clone()))
    }

    async fn get(&self, name: &str) -> Result<UnitStatus, PlatformError> {
        let pod = self.api.get(name).await.map_err(platform_error)?;
        Ok(pod_status(&pod))
    }

    async fn delete(&self, name: &str) -> Result<(), PlatformError> {
        self.api
            .delete(name, &DeleteParams::default())
            .await
            .map_err(platform_error)?;
        Ok(())
    }
}

/// Pod object for a unit
pub(crate) fn pod_manifest(name: &str, template: &UnitTemplate) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: (!template.labels.is_empty()).then(|| template.labels.clone()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: template.container_name.clone(),
                image: Some(template.image.clone()),
                ..Default::default()
            }],
            service_account_name: template.service_account.clone(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Map a pod onto the unit phase machine
///
/// A pod being deleted is `Terminating` whatever its phase says. Pods that
/// ran to completion or whose node lost track of them are `Failed`: neither
/// can ever serve an exec.
pub(crate) fn pod_status(pod: &Pod) -> UnitStatus {
    if pod.metadata.deletion_timestamp.is_some() {
        return UnitStatus::new(UnitPhase::Terminating);
    }

    let status = pod.status.as_ref();
    let phase = match status.and_then(|s| s.phase.as_deref()) {
        None | Some("Pending") => UnitPhase::Pending,
        Some("Running") => UnitPhase::Running,
        Some(_) => UnitPhase::Failed,
    };

    let waiting_reason = status
        .and_then(|s| s.container_statuses.as_ref())
        .and_then(|cs| {
            cs.iter()
                .find_map(|c| c.state.as_ref()?.waiting.as_ref()?.reason.clone())
        });
    let reason = status.and_then(|s| s.reason.clone()).or(waiting_reason);

    match reason {
        Some(reason) => UnitStatus::new(phase).with_reason(reason),
        None => UnitStatus::new(phase),
    }
}

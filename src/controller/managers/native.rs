//! Shared native-Kubernetes-primitive component manager.
//!
//! Builds the component's workload (Deployment or StatefulSet, depending on
//! whether it needs stable storage identity) and Service directly, without
//! going through a packaged chart release.

use async_trait::async_trait;
use kube::Client;

use crate::controller::resources::{
    self, ensure_deployment, ensure_service, ensure_statefulset, get_ready_replicas,
    WorkloadSpec,
};
use crate::crd::types::{ComponentCommon, ComponentName, ComponentStatus};
use crate::crd::ObservabilityPlatform;
use crate::error::Result;

use super::ComponentManager;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
}

pub struct NativeManager {
    pub component: ComponentName,
    pub workload_kind: WorkloadKind,
    pub container_port: i32,
}

impl NativeManager {
    fn image(&self, common: &ComponentCommon) -> String {
        let repo = match self.component {
            ComponentName::Prometheus => "quay.io/prometheus/prometheus",
            ComponentName::Grafana => "docker.io/grafana/grafana",
            ComponentName::Loki => "docker.io/grafana/loki",
            ComponentName::Tempo => "docker.io/grafana/tempo",
        };
        format!("{repo}:{}", common.version)
    }

    fn common<'a>(&self, platform: &'a ObservabilityPlatform) -> &'a ComponentCommon {
        match self.component {
            ComponentName::Prometheus => &platform.spec.prometheus.common,
            ComponentName::Grafana => &platform.spec.grafana.common,
            ComponentName::Loki => &platform.spec.loki.common,
            ComponentName::Tempo => &platform.spec.tempo.common,
        }
    }
}

#[async_trait]
impl ComponentManager for NativeManager {
    fn validate(&self, platform: &ObservabilityPlatform) -> Result<()> {
        let common = self.common(platform);
        if common.version.trim().is_empty() {
            return Err(crate::error::Error::Validation(format!(
                "{}: version must not be empty",
                self.component
            )));
        }
        Ok(())
    }

    async fn reconcile(&self, client: &Client, platform: &ObservabilityPlatform) -> Result<()> {
        let common = self.common(platform);
        if !common.enabled {
            self.delete(client, platform).await?;
            return Ok(());
        }

        let workload = WorkloadSpec {
            platform,
            component: self.component,
            image: self.image(common),
            common,
            container_port: self.container_port,
            args: vec![],
        };

        match self.workload_kind {
            WorkloadKind::Deployment => ensure_deployment(client, &workload).await?,
            WorkloadKind::StatefulSet => ensure_statefulset(client, &workload).await?,
        }

        ensure_service(client, platform, self.component, self.container_port).await?;
        Ok(())
    }

    async fn delete(&self, client: &Client, platform: &ObservabilityPlatform) -> Result<()> {
        resources::delete_component_resources(client, platform, self.component).await
    }

    async fn get_status(&self, client: &Client, platform: &ObservabilityPlatform) -> Result<ComponentStatus> {
        let common = self.common(platform);
        let ready_replicas = get_ready_replicas(client, platform, self.component).await;
        Ok(ComponentStatus {
            phase: if ready_replicas >= common.replicas {
                "Ready".to_string()
            } else {
                "Progressing".to_string()
            },
            version: Some(common.version.clone()),
            desired_replicas: common.replicas,
            ready_replicas,
            message: None,
            last_reconcile_time: Some(chrono::Utc::now().to_rfc3339()),
        })
    }

    fn get_service_url(&self, platform: &ObservabilityPlatform) -> String {
        let name = resources::resource_name(platform, self.component);
        let namespace = kube::ResourceExt::namespace(platform).unwrap_or_else(|| "default".to_string());
        format!(
            "http://{name}.{namespace}.svc.cluster.local:{}",
            self.container_port
        )
    }
}

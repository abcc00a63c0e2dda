use async_trait::async_trait;
use kube::Client;

use crate::crd::types::{ComponentName, ComponentStatus};
use crate::crd::ObservabilityPlatform;
use crate::error::Result;

use super::native::{NativeManager, WorkloadKind};
use super::ComponentManager;

pub struct GrafanaManager {
    inner: NativeManager,
}

impl GrafanaManager {
    pub fn new() -> Self {
        Self {
            inner: NativeManager {
                component: ComponentName::Grafana,
                workload_kind: WorkloadKind::Deployment,
                container_port: 3000,
            },
        }
    }
}

#[async_trait]
impl ComponentManager for GrafanaManager {
    fn validate(&self, platform: &ObservabilityPlatform) -> Result<()> {
        self.inner.validate(platform)
    }

    async fn reconcile(&self, client: &Client, platform: &ObservabilityPlatform) -> Result<()> {
        self.inner.reconcile(client, platform).await
    }

    async fn delete(&self, client: &Client, platform: &ObservabilityPlatform) -> Result<()> {
        self.inner.delete(client, platform).await
    }

    async fn get_status(&self, client: &Client, platform: &ObservabilityPlatform) -> Result<ComponentStatus> {
        self.inner.get_status(client, platform).await
    }

    fn get_service_url(&self, platform: &ObservabilityPlatform) -> String {
        self.inner.get_service_url(platform)
    }
}

use async_trait::async_trait;
use kube::Client;

use crate::crd::types::{ComponentName, ComponentStatus};
use crate::crd::ObservabilityPlatform;
use crate::error::{Error, Result};

use super::native::{NativeManager, WorkloadKind};
use super::ComponentManager;

pub struct PrometheusManager {
    inner: NativeManager,
}

impl PrometheusManager {
    pub fn new() -> Self {
        Self {
            inner: NativeManager {
                component: ComponentName::Prometheus,
                workload_kind: WorkloadKind::StatefulSet,
                container_port: 9090,
            },
        }
    }
}

#[async_trait]
impl ComponentManager for PrometheusManager {
    fn validate(&self, platform: &ObservabilityPlatform) -> Result<()> {
        self.inner.validate(platform)?;
        for rw in &platform.spec.prometheus.remote_write {
            if !rw.url.starts_with("http://") && !rw.url.starts_with("https://") {
                return Err(Error::Validation(format!(
                    "prometheus.remoteWrite url must be http(s): {}",
                    rw.url
                )));
            }
        }
        Ok(())
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

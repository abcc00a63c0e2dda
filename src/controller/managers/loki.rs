use async_trait::async_trait;
use kube::Client;

use crate::crd::types::{ComponentName, ComponentStatus};
use crate::crd::ObservabilityPlatform;
use crate::error::{Error, Result};

use super::native::{NativeManager, WorkloadKind};
use super::ComponentManager;

pub struct LokiManager {
    inner: NativeManager,
}

impl LokiManager {
    pub fn new() -> Self {
        Self {
            inner: NativeManager {
                component: ComponentName::Loki,
                workload_kind: WorkloadKind::StatefulSet,
                container_port: 3100,
            },
        }
    }
}

#[async_trait]
impl ComponentManager for LokiManager {
    fn validate(&self, platform: &ObservabilityPlatform) -> Result<()> {
        self.inner.validate(platform)?;
        if let Some(s3) = &platform.spec.loki.s3_backend {
            if s3.bucket.trim().is_empty() {
                return Err(Error::Validation(
                    "loki.s3Backend.bucket must not be empty".to_string(),
                ));
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

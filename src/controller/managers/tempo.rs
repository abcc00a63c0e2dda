use async_trait::async_trait;
use kube::Client;

use crate::crd::types::{ComponentName, ComponentStatus};
use crate::crd::ObservabilityPlatform;
use crate::error::{Error, Result};

use super::native::{NativeManager, WorkloadKind};
use super::ComponentManager;

pub struct TempoManager {
    inner: NativeManager,
}

impl TempoManager {
    pub fn new() -> Self {
        Self {
            inner: NativeManager {
                component: ComponentName::Tempo,
                workload_kind: WorkloadKind::StatefulSet,
                container_port: 3200,
            },
        }
    }
}

#[async_trait]
impl ComponentManager for TempoManager {
    fn validate(&self, platform: &ObservabilityPlatform) -> Result<()> {
        self.inner.validate(platform)?;
        if !(0.0..=1.0).contains(&platform.spec.tempo.sampling_rate) {
            return Err(Error::Validation(
                "tempo.samplingRate must be within [0.0, 1.0]".to_string(),
            ));
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

//! Component manager trait contract and the native/packaged-chart factory.

mod factory;
mod grafana;
mod loki;
mod native;
mod prometheus;
mod tempo;

pub use factory::build_manager;

use async_trait::async_trait;
use kube::Client;

use crate::crd::types::ComponentStatus;
use crate::crd::ObservabilityPlatform;
use crate::error::Result;

/// Contract every component (Prometheus/Grafana/Loki/Tempo) implements,
/// regardless of whether it's realized as raw Kubernetes primitives or a
/// packaged chart release.
#[async_trait]
pub trait ComponentManager: Send + Sync {
    /// Validates this component's portion of the spec before any resource
    /// is touched.
    fn validate(&self, platform: &ObservabilityPlatform) -> Result<()>;

    /// Creates or updates the component's resources to match the spec.
    async fn reconcile(&self, client: &Client, platform: &ObservabilityPlatform) -> Result<()>;

    /// Removes all resources owned by this component.
    async fn delete(&self, client: &Client, platform: &ObservabilityPlatform) -> Result<()>;

    /// Reads back the live state of the component's resources.
    async fn get_status(&self, client: &Client, platform: &ObservabilityPlatform) -> Result<ComponentStatus>;

    /// In-cluster URL a client can use to reach this component.
    fn get_service_url(&self, platform: &ObservabilityPlatform) -> String;
}

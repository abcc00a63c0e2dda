//! `ObservabilityPlatform` v1alpha1 — deprecated, conversion-only API version.
//!
//! Kept around purely so existing `v1alpha1` manifests keep working through
//! the conversion webhook; no code outside `crd::conversion` should construct
//! these types directly.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{ComponentStatus, Condition, HealthStatus, Phase};

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "obsplat.io",
    version = "v1alpha1",
    kind = "ObservabilityPlatform",
    namespaced,
    status = "ObservabilityPlatformStatusV1alpha1",
    shortname = "obsplat"
)]
#[serde(rename_all = "camelCase")]
pub struct ObservabilityPlatformSpecV1alpha1 {
    /// Old grouping: all four components nested under `monitoring`, as
    /// opposed to the v1beta1 top-level `prometheus`/`grafana`/`loki`/`tempo`.
    pub monitoring: MonitoringSpec,

    #[serde(default)]
    pub storage: StorageSpecV1alpha1,

    #[serde(default)]
    pub tls: TlsSpecV1alpha1,

    #[serde(default)]
    pub suspended: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringSpec {
    pub prometheus_version: String,
    pub grafana_version: String,
    pub loki_version: String,
    pub tempo_version: String,
    #[serde(default = "default_replicas")]
    pub replicas: i32,
}

fn default_replicas() -> i32 {
    1
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageSpecV1alpha1 {
    /// Old field name: `class`, renamed to `storageClassName` in v1beta1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default = "default_storage_size")]
    pub size: String,
}

fn default_storage_size() -> String {
    "50Gi".to_string()
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TlsSpecV1alpha1 {
    /// Old field: bare `manual: bool`, replaced by the v1beta1
    /// `TlsPolicy::{Disabled,CertManager,Manual}` enum.
    #[serde(default)]
    pub manual: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObservabilityPlatformStatusV1alpha1 {
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub component_status: BTreeMap<String, ComponentStatus>,
    #[serde(default)]
    pub health: HealthStatus,
}

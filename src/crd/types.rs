//! Shared types used across CRD versions, status, and component managers.
//!
//! # Type Hierarchy
//!
//! - [`ComponentName`] - the four observability-stack members
//! - [`ResourceRequirements`] / [`ResourceSpec`] - CPU/memory requests & limits
//! - [`StorageSpec`] - persistent storage configuration
//! - Component sub-specs: [`PrometheusSpec`], [`GrafanaSpec`], [`LokiSpec`], [`TempoSpec`]
//! - [`ScalingPolicy`] - per-component autoscaling policy
//! - [`CostOptimizationConfig`] - cost-aware scaling knobs
//! - [`Condition`] - status condition following Kubernetes conventions

use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The four observability-stack members this operator manages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentName {
    Prometheus,
    Grafana,
    Loki,
    Tempo,
}

impl ComponentName {
    /// All component kinds, in the dependency order the reconciler must
    /// apply them in (metrics → logs → traces → visualization).
    pub const RECONCILE_ORDER: [ComponentName; 4] = [
        ComponentName::Prometheus,
        ComponentName::Loki,
        ComponentName::Tempo,
        ComponentName::Grafana,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentName::Prometheus => "prometheus",
            ComponentName::Grafana => "grafana",
            ComponentName::Loki => "loki",
            ComponentName::Tempo => "tempo",
        }
    }

    /// Whether this component is ineligible for spot-instance scaling
    /// recommendations: the metrics engine, log ingester, and trace
    /// ingester are never spot-eligible; visualization may be.
    pub fn is_spot_eligible(&self) -> bool {
        matches!(self, ComponentName::Grafana)
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kubernetes-style resource requirements.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    pub requests: ResourceSpec,
    pub limits: ResourceSpec,
}

impl Default for ResourceRequirements {
    fn default() -> Self {
        Self {
            requests: ResourceSpec {
                cpu: "250m".to_string(),
                memory: "512Mi".to_string(),
            },
            limits: ResourceSpec {
                cpu: "1".to_string(),
                memory: "2Gi".to_string(),
            },
        }
    }
}

/// CPU/memory pair, expressed as Kubernetes resource quantity strings.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ResourceSpec {
    pub cpu: String,
    pub memory: String,
}

/// Persistent storage configuration for a component.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageSpec {
    #[serde(default = "default_storage_size")]
    pub size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

impl Default for StorageSpec {
    fn default() -> Self {
        Self {
            size: default_storage_size(),
            storage_class: None,
        }
    }
}

fn default_storage_size() -> String {
    "50Gi".to_string()
}

/// Common fields every component sub-spec carries.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentCommon {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub version: String,
    #[serde(default = "default_replicas")]
    pub replicas: i32,
    #[serde(default)]
    pub resources: ResourceRequirements,
    #[serde(default)]
    pub storage: StorageSpec,
}

pub fn default_true() -> bool {
    true
}

fn default_replicas() -> i32 {
    1
}

/// Metrics-engine (Prometheus) specific configuration.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusSpec {
    #[serde(flatten)]
    pub common: ComponentCommon,
    #[serde(default = "default_retention")]
    pub retention: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remote_write: Vec<RemoteWriteSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_labels: Option<BTreeMap<String, String>>,
}

fn default_retention() -> String {
    "15d".to_string()
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteWriteSpec {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_auth_secret_ref: Option<String>,
}

/// Visualization-engine (Grafana) specific configuration.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaSpec {
    #[serde(flatten)]
    pub common: ComponentCommon,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dashboard_config_maps: Vec<String>,
    #[serde(default)]
    pub anonymous_access: bool,
}

/// Log-store (Loki) specific configuration.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LokiSpec {
    #[serde(flatten)]
    pub common: ComponentCommon,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_backend: Option<S3BackendSpec>,
    #[serde(default = "default_log_retention")]
    pub log_retention: String,
}

fn default_log_retention() -> String {
    "168h".to_string()
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct S3BackendSpec {
    pub bucket: String,
    pub region: String,
    pub credentials_secret_ref: String,
}

/// Trace-store (Tempo) specific configuration.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TempoSpec {
    #[serde(flatten)]
    pub common: ComponentCommon,
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_backend: Option<S3BackendSpec>,
}

fn default_sampling_rate() -> f64 {
    0.1
}

/// Cross-cutting settings applying to every component.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_labels: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub tls_policy: TlsPolicy,
    #[serde(default = "default_log_retention")]
    pub log_retention: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TlsPolicy {
    #[default]
    Disabled,
    CertManager,
    Manual,
}

/// Per-component autoscaling policy.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScalingPolicy {
    #[serde(rename = "type")]
    pub policy_type: ScalingPolicyType,
    pub min_replicas: i32,
    pub max_replicas: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_cpu_percent: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_memory_percent: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_threshold: Option<f64>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ScalingPolicyType {
    Horizontal,
    Vertical,
    Predictive,
    CostAware,
}

/// Cost optimization knobs.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CostOptimizationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_budget: Option<f64>,
    #[serde(default)]
    pub spot_eligible: bool,
}

/// Status condition, following Kubernetes API conventions.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    pub last_transition_time: String,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionStatus::True => write!(f, "True"),
            ConditionStatus::False => write!(f, "False"),
            ConditionStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Well-known condition types.
pub const CONDITION_READY: &str = "Ready";
pub const CONDITION_PROGRESSING: &str = "Progressing";
pub const CONDITION_DEGRADED: &str = "Degraded";
pub const CONDITION_DEPRECATION_WARNING: &str = "DeprecationWarning";

/// Per-component observed status.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    pub phase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub desired_replicas: i32,
    pub ready_replicas: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reconcile_time: Option<String>,
}

/// Aggregated health summary.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub healthy: bool,
    pub healthy_count: i32,
    pub total_count: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, bool>,
}

/// Platform lifecycle phase.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Pending,
    Installing,
    Ready,
    Upgrading,
    Degraded,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

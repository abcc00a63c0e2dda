//! `ObservabilityPlatform` Custom Resource Definition (v1beta1, storage version).
//!
//! Represents a managed observability stack: Prometheus, Grafana, Loki, and
//! Tempo, reconciled as a single logical unit.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{
    ComponentStatus, Condition, CostOptimizationConfig, GlobalConfig, GrafanaSpec, HealthStatus,
    LokiSpec, Phase, PrometheusSpec, ScalingPolicy, TempoSpec,
};

/// Structured validation failure, surfaced via the admission webhook and
/// the reconciler's own guard before any component is touched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpecValidationError {
    pub field: String,
    pub message: String,
    pub how_to_fix: String,
}

impl SpecValidationError {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        how_to_fix: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            how_to_fix: how_to_fix.into(),
        }
    }
}

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "obsplat.io",
    version = "v1beta1",
    kind = "ObservabilityPlatform",
    namespaced,
    status = "ObservabilityPlatformStatus",
    shortname = "obsplat",
    shortname = "op",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ObservabilityPlatformSpec {
    #[serde(default)]
    pub global: GlobalConfig,

    pub prometheus: PrometheusSpec,
    pub grafana: GrafanaSpec,
    pub loki: LokiSpec,
    pub tempo: TempoSpec,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scaling: BTreeMap<String, ScalingPolicy>,

    #[serde(default)]
    pub cost_optimization: CostOptimizationConfig,

    #[serde(default)]
    pub suspended: bool,

    /// Backup schedule reference; the backup controller watches
    /// `PlatformBackup` objects independently, this just names the default
    /// schedule a freshly-created platform gets wired with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_schedule: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObservabilityPlatformStatus {
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

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub endpoints: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_backup_time: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deprecation_warnings: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ObservabilityPlatformSpec {
    /// Validates cross-field invariants that a JSON schema alone cannot
    /// express. Called both by the admission webhook and defensively by the
    /// reconciler before any component manager runs.
    pub fn validate(&self) -> Result<(), Vec<SpecValidationError>> {
        let mut errors = Vec::new();

        for (name, policy) in &self.scaling {
            if policy.min_replicas < 1 {
                errors.push(SpecValidationError::new(
                    format!("spec.scaling.{name}.minReplicas"),
                    "minReplicas must be at least 1",
                    "set minReplicas to 1 or higher",
                ));
            }
            if policy.max_replicas < policy.min_replicas {
                errors.push(SpecValidationError::new(
                    format!("spec.scaling.{name}.maxReplicas"),
                    "maxReplicas must be greater than or equal to minReplicas",
                    "raise maxReplicas or lower minReplicas",
                ));
            }
        }

        if self.cost_optimization.enabled {
            match self.cost_optimization.monthly_budget {
                Some(budget) if budget <= 0.0 => {
                    errors.push(SpecValidationError::new(
                        "spec.costOptimization.monthlyBudget",
                        "monthlyBudget must be positive when cost optimization is enabled",
                        "set monthlyBudget to a positive value or disable costOptimization",
                    ));
                }
                None => {
                    errors.push(SpecValidationError::new(
                        "spec.costOptimization.monthlyBudget",
                        "monthlyBudget is required when cost optimization is enabled",
                        "set spec.costOptimization.monthlyBudget",
                    ));
                }
                _ => {}
            }
        }

        if self.tempo.sampling_rate < 0.0 || self.tempo.sampling_rate > 1.0 {
            errors.push(SpecValidationError::new(
                "spec.tempo.samplingRate",
                "samplingRate must be between 0.0 and 1.0",
                "set spec.tempo.samplingRate within [0.0, 1.0]",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::types::{
        ComponentCommon, ResourceRequirements, ScalingPolicyType, StorageSpec,
    };

    fn common() -> ComponentCommon {
        ComponentCommon {
            enabled: true,
            version: "v1.0.0".to_string(),
            replicas: 1,
            resources: ResourceRequirements::default(),
            storage: StorageSpec::default(),
        }
    }

    fn minimal_spec() -> ObservabilityPlatformSpec {
        ObservabilityPlatformSpec {
            global: GlobalConfig::default(),
            prometheus: PrometheusSpec {
                common: common(),
                retention: "15d".to_string(),
                remote_write: vec![],
                external_labels: None,
            },
            grafana: GrafanaSpec {
                common: common(),
                dashboard_config_maps: vec![],
                anonymous_access: false,
            },
            loki: LokiSpec {
                common: common(),
                s3_backend: None,
                log_retention: "168h".to_string(),
            },
            tempo: TempoSpec {
                common: common(),
                sampling_rate: 0.1,
                s3_backend: None,
            },
            scaling: BTreeMap::new(),
            cost_optimization: CostOptimizationConfig::default(),
            suspended: false,
            backup_schedule: None,
        }
    }

    #[test]
    fn minimal_spec_validates() {
        assert!(minimal_spec().validate().is_ok());
    }

    #[test]
    fn rejects_max_less_than_min_replicas() {
        let mut spec = minimal_spec();
        spec.scaling.insert(
            "prometheus".to_string(),
            ScalingPolicy {
                policy_type: ScalingPolicyType::Horizontal,
                min_replicas: 3,
                max_replicas: 2,
                target_cpu_percent: Some(70),
                target_memory_percent: None,
                cost_threshold: None,
            },
        );
        let errors = spec.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field.contains("maxReplicas")));
    }

    #[test]
    fn rejects_cost_optimization_without_budget() {
        let mut spec = minimal_spec();
        spec.cost_optimization.enabled = true;
        let errors = spec.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field.contains("monthlyBudget")));
    }

    #[test]
    fn rejects_sampling_rate_out_of_range() {
        let mut spec = minimal_spec();
        spec.tempo.sampling_rate = 1.5;
        let errors = spec.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field.contains("samplingRate")));
    }
}

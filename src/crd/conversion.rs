//! Bijective conversion between `v1alpha1` and `v1beta1` of
//! `ObservabilityPlatform`.
//!
//! `v1beta1` is the storage version; the conversion webhook calls
//! [`up`] when the API server reads a stored `v1beta1` object back as
//! `v1alpha1`, and [`down`] when a client writes `v1alpha1` and the object
//! needs to be stored as `v1beta1`. Fields that exist only on one side are
//! filled with the documented default on the way up, and simply dropped (not
//! silently renamed) on the way down — every rename is explicit below.

use super::platform::{ObservabilityPlatformSpec, ObservabilityPlatformStatus};
use super::platform_v1alpha1::{
    MonitoringSpec, ObservabilityPlatformSpecV1alpha1, ObservabilityPlatformStatusV1alpha1,
    StorageSpecV1alpha1, TlsSpecV1alpha1,
};
use super::types::{
    ComponentCommon, CostOptimizationConfig, GlobalConfig, GrafanaSpec, LokiSpec, PrometheusSpec,
    ResourceRequirements, StorageSpec, TempoSpec, TlsPolicy,
};
use std::collections::BTreeMap;

/// `v1alpha1` -> `v1beta1`.
///
/// Renames: `spec.monitoring.*Version` -> `spec.{component}.version`,
/// `spec.storage.class` -> `spec.{component}.storage.storageClass`,
/// `spec.tls.manual` -> `spec.global.tlsPolicy` (`true` -> `Manual`,
/// `false` -> `Disabled`).
pub fn down(src: ObservabilityPlatformSpecV1alpha1) -> ObservabilityPlatformSpec {
    let storage = StorageSpec {
        size: src.storage.size.clone(),
        storage_class: src.storage.class.clone(),
    };

    let common = |version: &str| ComponentCommon {
        enabled: true,
        version: version.to_string(),
        replicas: src.monitoring.replicas,
        resources: ResourceRequirements::default(),
        storage: storage.clone(),
    };

    ObservabilityPlatformSpec {
        global: GlobalConfig {
            external_labels: None,
            tls_policy: if src.tls.manual {
                TlsPolicy::Manual
            } else {
                TlsPolicy::Disabled
            },
            log_retention: "168h".to_string(),
        },
        prometheus: PrometheusSpec {
            common: common(&src.monitoring.prometheus_version),
            retention: "15d".to_string(),
            remote_write: vec![],
            external_labels: None,
        },
        grafana: GrafanaSpec {
            common: common(&src.monitoring.grafana_version),
            dashboard_config_maps: vec![],
            anonymous_access: false,
        },
        loki: LokiSpec {
            common: common(&src.monitoring.loki_version),
            s3_backend: None,
            log_retention: "168h".to_string(),
        },
        tempo: TempoSpec {
            common: common(&src.monitoring.tempo_version),
            sampling_rate: 0.1,
            s3_backend: None,
        },
        scaling: BTreeMap::new(),
        cost_optimization: CostOptimizationConfig::default(),
        suspended: src.suspended,
        backup_schedule: None,
    }
}

/// `v1beta1` -> `v1alpha1`. Inverse of [`down`] for the fields that exist
/// in both; fields introduced in `v1beta1` (remote write, scaling policies,
/// cost optimization, per-component storage classes) have no `v1alpha1`
/// representation and are dropped, matching the deprecated version's
/// narrower contract.
pub fn up(src: ObservabilityPlatformSpec) -> ObservabilityPlatformSpecV1alpha1 {
    ObservabilityPlatformSpecV1alpha1 {
        monitoring: MonitoringSpec {
            prometheus_version: src.prometheus.common.version,
            grafana_version: src.grafana.common.version,
            loki_version: src.loki.common.version,
            tempo_version: src.tempo.common.version,
            replicas: src.prometheus.common.replicas,
        },
        storage: StorageSpecV1alpha1 {
            class: src.prometheus.common.storage.storage_class,
            size: src.prometheus.common.storage.size,
        },
        tls: TlsSpecV1alpha1 {
            manual: matches!(src.global.tls_policy, TlsPolicy::Manual),
        },
        suspended: src.suspended,
    }
}

pub fn status_down(status: ObservabilityPlatformStatusV1alpha1) -> ObservabilityPlatformStatus {
    ObservabilityPlatformStatus {
        phase: status.phase,
        observed_generation: status.observed_generation,
        conditions: status.conditions,
        component_status: status.component_status,
        health: status.health,
        endpoints: BTreeMap::new(),
        last_backup_time: None,
        deprecation_warnings: vec![],
        message: None,
    }
}

pub fn status_up(status: ObservabilityPlatformStatus) -> ObservabilityPlatformStatusV1alpha1 {
    ObservabilityPlatformStatusV1alpha1 {
        phase: status.phase,
        observed_generation: status.observed_generation,
        conditions: status.conditions,
        component_status: status.component_status,
        health: status.health,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_v1alpha1() -> ObservabilityPlatformSpecV1alpha1 {
        ObservabilityPlatformSpecV1alpha1 {
            monitoring: MonitoringSpec {
                prometheus_version: "v2.53.0".to_string(),
                grafana_version: "11.2.0".to_string(),
                loki_version: "3.1.0".to_string(),
                tempo_version: "2.5.0".to_string(),
                replicas: 2,
            },
            storage: StorageSpecV1alpha1 {
                class: Some("fast-ssd".to_string()),
                size: "100Gi".to_string(),
            },
            tls: TlsSpecV1alpha1 { manual: true },
            suspended: false,
        }
    }

    #[test]
    fn round_trips_overlapping_fields() {
        let original = sample_v1alpha1();
        let round_tripped = up(down(original.clone()));
        assert_eq!(original.monitoring, round_tripped.monitoring);
        assert_eq!(original.storage, round_tripped.storage);
        assert_eq!(original.tls, round_tripped.tls);
        assert_eq!(original.suspended, round_tripped.suspended);
    }

    #[test]
    fn manual_tls_becomes_manual_policy() {
        let converted = down(sample_v1alpha1());
        assert_eq!(converted.global.tls_policy, TlsPolicy::Manual);
    }

    #[test]
    fn non_manual_tls_becomes_disabled_policy() {
        let mut src = sample_v1alpha1();
        src.tls.manual = false;
        let converted = down(src);
        assert_eq!(converted.global.tls_policy, TlsPolicy::Disabled);
    }
}

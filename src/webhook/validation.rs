//! Validating admission logic for `ObservabilityPlatform`.
//!
//! Runs two independent checks against an incoming object: the spec's own
//! structural invariants (replica bounds, cost-budget presence, sampling
//! rate range) and the deprecation registry (warn, or reject when a
//! deprecated path's severity, recomputed against its removal schedule,
//! comes back critical).

use kube::core::admission::AdmissionRequest;

use crate::controller::metrics::{self, DeprecationLabels};
use crate::crd::deprecation;
use crate::crd::ObservabilityPlatform;

pub struct ValidationOutcome {
    pub allowed: bool,
    pub message: Option<String>,
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    fn allow() -> Self {
        Self {
            allowed: true,
            message: None,
            warnings: Vec::new(),
        }
    }

    fn deny(message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            message: Some(message.into()),
            warnings: Vec::new(),
        }
    }
}

pub fn validate(req: &AdmissionRequest<ObservabilityPlatform>) -> ValidationOutcome {
    let Some(object) = &req.object else {
        return ValidationOutcome::allow();
    };

    if let Err(errors) = object.spec.validate() {
        let message = errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        return ValidationOutcome::deny(message);
    }

    let raw = match serde_json::to_value(object) {
        Ok(v) => v,
        Err(e) => return ValidationOutcome::deny(format!("failed to serialize object: {e}")),
    };
    let api_version = raw
        .pointer("/apiVersion")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("obsplat.io/v1beta1");
    let check = deprecation::check(&raw, api_version);

    for rejection in &check.rejections {
        metrics::DEPRECATION_USAGE_TOTAL
            .get_or_create(&DeprecationLabels { path: rejection.path.to_string() })
            .inc();
    }
    for warning in &check.warnings {
        metrics::DEPRECATION_USAGE_TOTAL
            .get_or_create(&DeprecationLabels { path: warning.path.to_string() })
            .inc();
    }

    if !check.rejections.is_empty() {
        let message = check
            .rejections
            .iter()
            .map(|r| format!("{} is no longer accepted: {}", r.path, r.message))
            .collect::<Vec<_>>()
            .join("; ");
        return ValidationOutcome::deny(message);
    }

    let warnings = check
        .warnings
        .iter()
        .map(|w| format!("{} is deprecated: {}", w.path, w.message))
        .collect();

    ValidationOutcome {
        allowed: true,
        message: None,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::TypeMeta;

    fn minimal_platform() -> ObservabilityPlatform {
        serde_json::from_value(serde_json::json!({
            "apiVersion": "obsplat.io/v1beta1",
            "kind": "ObservabilityPlatform",
            "metadata": { "name": "demo", "namespace": "default" },
            "spec": {
                "global": { "tlsPolicy": "Disabled", "logRetention": "168h" },
                "prometheus": { "enabled": true, "version": "v2.53.0", "replicas": 1,
                    "resources": { "requests": { "cpu": "500m", "memory": "1Gi" }, "limits": { "cpu": "1", "memory": "2Gi" } },
                    "storage": { "size": "50Gi" }, "retention": "15d", "remoteWrite": [] },
                "grafana": { "enabled": true, "version": "11.2.0", "replicas": 1,
                    "resources": { "requests": { "cpu": "500m", "memory": "1Gi" }, "limits": { "cpu": "1", "memory": "2Gi" } },
                    "storage": { "size": "50Gi" }, "dashboardConfigMaps": [], "anonymousAccess": false },
                "loki": { "enabled": true, "version": "3.1.0", "replicas": 1,
                    "resources": { "requests": { "cpu": "500m", "memory": "1Gi" }, "limits": { "cpu": "1", "memory": "2Gi" } },
                    "storage": { "size": "50Gi" }, "logRetention": "168h" },
                "tempo": { "enabled": true, "version": "2.5.0", "replicas": 1,
                    "resources": { "requests": { "cpu": "500m", "memory": "1Gi" }, "limits": { "cpu": "1", "memory": "2Gi" } },
                    "storage": { "size": "50Gi" }, "samplingRate": 0.1 },
                "scaling": {},
                "suspended": false
            }
        }))
        .unwrap()
    }

    fn request_for(object: ObservabilityPlatform) -> AdmissionRequest<ObservabilityPlatform> {
        AdmissionRequest {
            types: TypeMeta::default(),
            uid: "test".to_string(),
            kind: Default::default(),
            resource: Default::default(),
            sub_resource: None,
            request_kind: None,
            request_resource: None,
            request_sub_resource: None,
            name: "demo".to_string(),
            namespace: Some("default".to_string()),
            operation: kube::core::admission::Operation::Create,
            user_info: Default::default(),
            object: Some(object),
            old_object: None,
            dry_run: false,
            options: None,
        }
    }

    #[test]
    fn clean_minimal_object_is_allowed() {
        let req = request_for(minimal_platform());
        let outcome = validate(&req);
        assert!(outcome.allowed, "{:?}", outcome.message);
        assert!(outcome.warnings.is_empty());
    }
}

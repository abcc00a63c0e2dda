//! Mutating admission logic: auto-migrates deprecated field shapes to
//! their `v1beta1` replacement and fills in standard labels.
//!
//! Deprecated fields are migrated from the raw request JSON rather than
//! the typed [`ObservabilityPlatform`](crate::crd::ObservabilityPlatform),
//! because a struct that only models the current shape can't see fields
//! it no longer declares.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::info;

use crate::error::Result;

const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
const PART_OF_LABEL: &str = "app.kubernetes.io/part-of";
const OPERATOR_NAME: &str = "obsplat-operator";

/// Builds a JSON Patch (RFC 6902) migrating any deprecated fields present
/// on `object` to their `v1beta1` replacement and adding standard labels.
/// Returns `None` if no mutation is needed.
pub fn apply_mutations(object: &Value) -> Result<Option<Value>> {
    let mut patches = Vec::new();

    migrate_monitoring_block(object, &mut patches);
    migrate_storage_class(object, &mut patches);
    migrate_tls_manual(object, &mut patches);
    add_standard_labels(object, &mut patches);

    if patches.is_empty() {
        Ok(None)
    } else {
        Ok(Some(json!(patches)))
    }
}

fn migrate_monitoring_block(object: &Value, patches: &mut Vec<Value>) {
    let Some(monitoring) = object.pointer("/spec/monitoring") else {
        return;
    };

    for (field, component) in [
        ("prometheusVersion", "prometheus"),
        ("grafanaVersion", "grafana"),
        ("lokiVersion", "loki"),
        ("tempoVersion", "tempo"),
    ] {
        if let Some(version) = monitoring.get(field).and_then(Value::as_str) {
            let target_path = format!("/spec/{component}/version");
            if object.pointer(&target_path).is_none() {
                patches.push(json!({ "op": "add", "path": target_path, "value": version }));
            }
        }
    }

    info!("migrated deprecated spec.monitoring block to per-component fields");
    patches.push(json!({ "op": "remove", "path": "/spec/monitoring" }));
}

fn migrate_storage_class(object: &Value, patches: &mut Vec<Value>) {
    let Some(class) = object.pointer("/spec/storage/class").and_then(Value::as_str) else {
        return;
    };

    for component in ["prometheus", "grafana", "loki", "tempo"] {
        let target_path = format!("/spec/{component}/storage/storageClass");
        if object.pointer(&format!("/spec/{component}")).is_some()
            && object.pointer(&target_path).is_none()
        {
            patches.push(json!({ "op": "add", "path": target_path, "value": class }));
        }
    }

    info!("migrated deprecated spec.storage.class to per-component storageClass");
    patches.push(json!({ "op": "remove", "path": "/spec/storage" }));
}

fn migrate_tls_manual(object: &Value, patches: &mut Vec<Value>) {
    let Some(manual) = object.pointer("/spec/tls/manual").and_then(Value::as_bool) else {
        return;
    };

    let policy = if manual { "Manual" } else { "Disabled" };
    if object.pointer("/spec/global/tlsPolicy").is_none() {
        if object.pointer("/spec/global").is_none() {
            patches.push(json!({ "op": "add", "path": "/spec/global", "value": {} }));
        }
        patches.push(json!({ "op": "add", "path": "/spec/global/tlsPolicy", "value": policy }));
    }

    info!("migrated deprecated spec.tls.manual to spec.global.tlsPolicy");
    patches.push(json!({ "op": "remove", "path": "/spec/tls" }));
}

fn add_standard_labels(object: &Value, patches: &mut Vec<Value>) {
    let name = object
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .unwrap_or("unknown");

    let mut labels = BTreeMap::new();
    labels.insert("app.kubernetes.io/name".to_string(), "observability-platform".to_string());
    labels.insert("app.kubernetes.io/instance".to_string(), name.to_string());
    labels.insert(MANAGED_BY_LABEL.to_string(), OPERATOR_NAME.to_string());
    labels.insert(PART_OF_LABEL.to_string(), "obsplat".to_string());

    let has_labels = object.pointer("/metadata/labels").is_some();
    if !has_labels {
        patches.push(json!({ "op": "add", "path": "/metadata/labels", "value": {} }));
    }

    for (key, value) in labels {
        let existing = object
            .pointer(&format!("/metadata/labels/{}", key.replace('/', "~1")))
            .is_some();
        if existing {
            continue;
        }
        patches.push(json!({
            "op": "add",
            "path": format!("/metadata/labels/{}", key.replace('/', "~1")),
            "value": value
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_mutation_needed_for_clean_object() {
        let object = json!({
            "metadata": { "name": "demo", "labels": {
                "app.kubernetes.io/name": "observability-platform",
                "app.kubernetes.io/instance": "demo",
                "app.kubernetes.io/managed-by": "obsplat-operator",
                "app.kubernetes.io/part-of": "obsplat"
            }},
            "spec": { "prometheus": { "version": "v2.53.0" } }
        });
        let patch = apply_mutations(&object).unwrap();
        assert!(patch.is_none());
    }

    #[test]
    fn migrates_deprecated_monitoring_block() {
        let object = json!({
            "metadata": { "name": "demo" },
            "spec": {
                "monitoring": { "prometheusVersion": "v2.53.0", "replicas": 1 },
                "prometheus": {}
            }
        });
        let patch = apply_mutations(&object).unwrap().unwrap();
        let ops: Vec<Value> = serde_json::from_value(patch).unwrap();
        assert!(ops.iter().any(|op| op["path"] == "/spec/prometheus/version"));
        assert!(ops.iter().any(|op| op["op"] == "remove" && op["path"] == "/spec/monitoring"));
    }

    #[test]
    fn migrates_tls_manual_to_policy() {
        let object = json!({
            "metadata": { "name": "demo" },
            "spec": { "tls": { "manual": true } }
        });
        let patch = apply_mutations(&object).unwrap().unwrap();
        let ops: Vec<Value> = serde_json::from_value(patch).unwrap();
        assert!(ops.iter().any(|op| op["path"] == "/spec/global/tlsPolicy" && op["value"] == "Manual"));
    }
}

//! Shared types for the admission webhook handlers.

use std::collections::BTreeMap;

use serde::Serialize;

/// Health/readiness payload returned by the webhook's own probe endpoints.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Walks a JSON object and returns every dotted field path present,
/// flattening nested objects but not arrays, so the deprecation registry
/// can be checked against a request without a schema-aware walk per field.
pub fn flatten_paths(value: &serde_json::Value) -> Vec<String> {
    let mut paths = Vec::new();
    walk(value, String::new(), &mut paths);
    paths
}

fn walk(value: &serde_json::Value, prefix: String, out: &mut Vec<String>) {
    if let serde_json::Value::Object(map) = value {
        for (k, v) in map {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            out.push(path.clone());
            walk(v, path, out);
        }
    }
}

/// Per-request audit trail of what the webhook decided, kept only for the
/// lifetime of handling one admission request.
#[derive(Debug, Default, Serialize)]
pub struct AdmissionAudit {
    pub warnings: Vec<String>,
    pub annotations: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_nested_object_paths() {
        let value = serde_json::json!({
            "spec": {
                "monitoring": { "prometheusVersion": "v2.53.0" },
                "tls": { "manual": true }
            }
        });
        let paths = flatten_paths(&value);
        assert!(paths.contains(&"spec.monitoring".to_string()));
        assert!(paths.contains(&"spec.monitoring.prometheusVersion".to_string()));
        assert!(paths.contains(&"spec.tls.manual".to_string()));
    }
}

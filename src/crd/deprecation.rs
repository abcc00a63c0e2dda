//! Field-, value-, feature-, and API-version-level deprecation registry.
//!
//! Tracks deprecated shapes on the submitted resource, their replacement,
//! and a removal schedule, and recomputes how severely each should be
//! treated at check time rather than trusting a severity frozen at
//! registration.

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What aspect of the resource a registry entry tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeprecationType {
    /// The path itself is deprecated, regardless of its value.
    Field,
    /// The path's value has crossed a declared floor (or equals a declared
    /// literal).
    Value,
    /// The path gates an opt-in feature that is deprecated when truthy.
    Feature,
    /// The resource's declared `apiVersion` itself is deprecated.
    ApiVersion,
}

/// Severity of using a deprecated shape. Ordered `Info < Warning <
/// Critical` so effective-severity recomputation can escalate with `max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeprecationSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Clone, Debug)]
pub struct DeprecationRegistryEntry {
    pub kind: DeprecationType,
    /// Dotted path into the resource, e.g. `spec.tls.manual`, or (for
    /// `ApiVersion` entries) the deprecated `apiVersion` string itself.
    pub path: &'static str,
    /// For `Value` entries: the literal the field is compared against, or
    /// the minimum semantic version required when the path's last segment
    /// is `version`.
    pub value: Option<&'static str>,
    pub message: &'static str,
    pub alternative_path: Option<&'static str>,
    pub migration_guide: &'static str,
    pub affected_versions: &'static [&'static str],
    pub deprecated_since: NaiveDate,
    pub removal_date: Option<NaiveDate>,
    pub severity: DeprecationSeverity,
}

pub static REGISTRY: Lazy<Vec<DeprecationRegistryEntry>> = Lazy::new(|| {
    vec![
        DeprecationRegistryEntry {
            kind: DeprecationType::Field,
            path: "spec.monitoring",
            value: None,
            message: "spec.monitoring was replaced by top-level per-component specs in v1beta1",
            alternative_path: Some("spec.prometheus / spec.grafana / spec.loki / spec.tempo"),
            migration_guide: "split spec.monitoring.<component>Version into spec.<component>.version for each component",
            affected_versions: &["v1alpha1"],
            deprecated_since: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            removal_date: Some(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()),
            severity: DeprecationSeverity::Warning,
        },
        DeprecationRegistryEntry {
            kind: DeprecationType::Field,
            path: "spec.storage.class",
            value: None,
            message: "spec.storage.class moved under each component's storage block",
            alternative_path: Some("spec.<component>.storage.storageClass"),
            migration_guide: "copy spec.storage.class to spec.<component>.storage.storageClass for each component",
            affected_versions: &["v1alpha1"],
            deprecated_since: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            removal_date: Some(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()),
            severity: DeprecationSeverity::Warning,
        },
        DeprecationRegistryEntry {
            kind: DeprecationType::Field,
            path: "spec.tls.manual",
            value: None,
            message: "spec.tls.manual was replaced by the tlsPolicy enum",
            alternative_path: Some("spec.global.tlsPolicy"),
            migration_guide: "true -> tlsPolicy: Manual, false -> tlsPolicy: Disabled",
            affected_versions: &["v1alpha1"],
            deprecated_since: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            removal_date: Some(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()),
            severity: DeprecationSeverity::Info,
        },
        DeprecationRegistryEntry {
            kind: DeprecationType::Value,
            path: "spec.prometheus.version",
            value: Some("v2.45.0"),
            message: "Prometheus versions below v2.45.0 are no longer supported",
            alternative_path: None,
            migration_guide: "bump spec.prometheus.version to at least v2.45.0",
            affected_versions: &["v1alpha1", "v1beta1"],
            deprecated_since: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            removal_date: None,
            severity: DeprecationSeverity::Warning,
        },
        DeprecationRegistryEntry {
            kind: DeprecationType::Feature,
            path: "spec.grafana.anonymousAccess",
            value: None,
            message: "anonymous Grafana access is deprecated and will be rejected by a future admission policy",
            alternative_path: None,
            migration_guide: "front Grafana with your own auth proxy or enable Grafana's own OAuth integration",
            affected_versions: &["v1alpha1", "v1beta1"],
            deprecated_since: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            removal_date: None,
            severity: DeprecationSeverity::Info,
        },
        DeprecationRegistryEntry {
            kind: DeprecationType::ApiVersion,
            path: "obsplat.io/v1alpha1",
            value: None,
            message: "obsplat.io/v1alpha1 is deprecated in favor of v1beta1",
            alternative_path: Some("obsplat.io/v1beta1"),
            migration_guide: "write new ObservabilityPlatform resources against v1beta1; existing v1alpha1 objects keep converting transparently",
            affected_versions: &["v1alpha1"],
            deprecated_since: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            removal_date: Some(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()),
            severity: DeprecationSeverity::Warning,
        },
    ]
});

fn value_at<'a>(object: &'a Value, dotted_path: &str) -> Option<&'a Value> {
    let mut current = object;
    for segment in dotted_path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::String(s) => !s.is_empty(),
        Value::Number(_) => true,
    }
}

fn parse_semver(s: &str) -> Option<(u64, u64, u64)> {
    let s = s.strip_prefix('v').unwrap_or(s);
    let mut parts = s.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().unwrap_or("0").parse().ok()?;
    let patch = parts.next().unwrap_or("0").parse().ok()?;
    Some((major, minor, patch))
}

fn value_triggered(actual: &Value, floor: &str, path: &str) -> bool {
    let is_version_field = path.rsplit('.').next() == Some("version");
    if is_version_field {
        if let (Some(actual_str), Some(required)) = (actual.as_str(), parse_semver(floor)) {
            if let Some(parsed_actual) = parse_semver(actual_str) {
                return parsed_actual < required;
            }
            // Non-semver value on a version field: the spec flags this as
            // falling back to lexicographic comparison, which is almost
            // certainly wrong; treat it as triggered so it surfaces rather
            // than silently passing.
            return actual_str != floor;
        }
    }
    actual.as_str() == Some(floor)
}

/// Recomputes severity at check time from the removal/deprecation
/// schedule: critical within 90 days of removal, warning within 180 days
/// of removal or once the entry has been deprecated for over 180 days,
/// otherwise the declared severity.
fn effective_severity(entry: &DeprecationRegistryEntry, today: NaiveDate) -> DeprecationSeverity {
    if let Some(removal_date) = entry.removal_date {
        let days_to_removal = (removal_date - today).num_days();
        if days_to_removal <= 90 {
            return DeprecationSeverity::Critical;
        }
        if days_to_removal <= 180 {
            return entry.severity.max(DeprecationSeverity::Warning);
        }
    }
    let days_deprecated = (today - entry.deprecated_since).num_days();
    if days_deprecated > 180 {
        return entry.severity.max(DeprecationSeverity::Warning);
    }
    entry.severity
}

/// One triggered deprecation, with its severity as recomputed at check
/// time (which may differ from the registry's declared severity).
#[derive(Clone, Debug)]
pub struct DeprecationFinding {
    pub path: &'static str,
    pub message: &'static str,
    pub alternative_path: Option<&'static str>,
    pub migration_guide: &'static str,
    pub severity: DeprecationSeverity,
}

pub struct DeprecationCheck {
    pub warnings: Vec<DeprecationFinding>,
    pub rejections: Vec<DeprecationFinding>,
}

impl DeprecationCheck {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.rejections.is_empty()
    }
}

/// Checks every registry entry against a submitted resource (as raw JSON,
/// so deprecated paths the current typed model no longer declares are
/// still visible) and its declared `apiVersion`. Entries whose recomputed
/// severity is `Critical` are returned as rejections; everything else
/// triggered is a warning.
pub fn check(object: &Value, api_version: &str) -> DeprecationCheck {
    let today = Utc::now().date_naive();
    let mut warnings = Vec::new();
    let mut rejections = Vec::new();

    for entry in REGISTRY.iter() {
        let triggered = match entry.kind {
            DeprecationType::Field => value_at(object, entry.path).is_some(),
            DeprecationType::Feature => value_at(object, entry.path).map(is_truthy).unwrap_or(false),
            DeprecationType::Value => match (value_at(object, entry.path), entry.value) {
                (Some(actual), Some(floor)) => value_triggered(actual, floor, entry.path),
                _ => false,
            },
            DeprecationType::ApiVersion => api_version == entry.path,
        };
        if !triggered {
            continue;
        }

        let finding = DeprecationFinding {
            path: entry.path,
            message: entry.message,
            alternative_path: entry.alternative_path,
            migration_guide: entry.migration_guide,
            severity: effective_severity(entry, today),
        };

        if finding.severity == DeprecationSeverity::Critical {
            rejections.push(finding);
        } else {
            warnings.push(finding);
        }
    }

    DeprecationCheck { warnings, rejections }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_request_has_no_findings() {
        let object = serde_json::json!({ "spec": { "prometheus": { "version": "v2.53.0" } } });
        let check = check(&object, "obsplat.io/v1beta1");
        assert!(check.is_clean());
    }

    #[test]
    fn field_deprecation_present_is_a_finding() {
        let object = serde_json::json!({ "spec": { "tls": { "manual": true } } });
        let check = check(&object, "obsplat.io/v1beta1");
        assert_eq!(check.warnings.len(), 1);
        assert_eq!(check.warnings[0].path, "spec.tls.manual");
    }

    #[test]
    fn value_deprecation_below_floor_triggers() {
        let object = serde_json::json!({ "spec": { "prometheus": { "version": "v2.30.0" } } });
        let check = check(&object, "obsplat.io/v1beta1");
        assert!(check.warnings.iter().any(|w| w.path == "spec.prometheus.version"));
    }

    #[test]
    fn value_deprecation_at_or_above_floor_does_not_trigger() {
        let object = serde_json::json!({ "spec": { "prometheus": { "version": "v2.53.0" } } });
        let check = check(&object, "obsplat.io/v1beta1");
        assert!(!check.warnings.iter().any(|w| w.path == "spec.prometheus.version"));
    }

    #[test]
    fn feature_deprecation_triggers_only_when_truthy() {
        let enabled = serde_json::json!({ "spec": { "grafana": { "anonymousAccess": true } } });
        let disabled = serde_json::json!({ "spec": { "grafana": { "anonymousAccess": false } } });
        assert!(check(&enabled, "obsplat.io/v1beta1")
            .warnings
            .iter()
            .any(|w| w.path == "spec.grafana.anonymousAccess"));
        assert!(!check(&disabled, "obsplat.io/v1beta1")
            .warnings
            .iter()
            .any(|w| w.path == "spec.grafana.anonymousAccess"));
    }

    #[test]
    fn api_version_deprecation_triggers_on_declared_version() {
        let object = serde_json::json!({});
        let check = check(&object, "obsplat.io/v1alpha1");
        assert!(check.warnings.iter().any(|w| w.path == "obsplat.io/v1alpha1"));
    }

    #[test]
    fn removal_date_within_90_days_is_critical_regardless_of_declared_severity() {
        let today = Utc::now().date_naive();
        let entry = DeprecationRegistryEntry {
            kind: DeprecationType::Field,
            path: "spec.example",
            value: None,
            message: "example",
            alternative_path: None,
            migration_guide: "example",
            affected_versions: &[],
            deprecated_since: today - chrono::Duration::days(400),
            removal_date: Some(today + chrono::Duration::days(30)),
            severity: DeprecationSeverity::Info,
        };
        assert_eq!(effective_severity(&entry, today), DeprecationSeverity::Critical);
    }

    #[test]
    fn long_deprecated_entry_without_removal_date_escalates_to_warning() {
        let today = Utc::now().date_naive();
        let entry = DeprecationRegistryEntry {
            kind: DeprecationType::Field,
            path: "spec.example",
            value: None,
            message: "example",
            alternative_path: None,
            migration_guide: "example",
            affected_versions: &[],
            deprecated_since: today - chrono::Duration::days(365),
            removal_date: None,
            severity: DeprecationSeverity::Info,
        };
        assert_eq!(effective_severity(&entry, today), DeprecationSeverity::Warning);
    }

    #[test]
    fn fresh_deprecation_keeps_declared_severity() {
        let today = Utc::now().date_naive();
        let entry = DeprecationRegistryEntry {
            kind: DeprecationType::Field,
            path: "spec.example",
            value: None,
            message: "example",
            alternative_path: None,
            migration_guide: "example",
            affected_versions: &[],
            deprecated_since: today - chrono::Duration::days(5),
            removal_date: Some(today + chrono::Duration::days(300)),
            severity: DeprecationSeverity::Info,
        };
        assert_eq!(effective_severity(&entry, today), DeprecationSeverity::Info);
    }
}

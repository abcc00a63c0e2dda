//! Percentile-based vertical scaling recommendations, plus the
//! `VerticalPodAutoscaler` resource builder for components opted into
//! `vertical` scaling.
//!
//! `k8s-openapi` does not ship VPA types, so the resource is modeled as a
//! `DynamicObject` against the `autoscaling.k8s.io/v1` group, the same way
//! the teacher's own VPA integration does.

use kube::{
    api::{Api, ApiResource, DynamicObject, GroupVersionKind, Patch, PatchParams},
    core::ObjectMeta,
    Client, Resource, ResourceExt,
};
use serde_json::json;

use crate::crd::types::{ComponentName, ResourceRequirements, ResourceSpec};
use crate::crd::ObservabilityPlatform;
use crate::error::{Error, Result};

const VPA_GROUP: &str = "autoscaling.k8s.io";
const VPA_VERSION: &str = "v1";
const VPA_KIND: &str = "VerticalPodAutoscaler";
const FIELD_MANAGER: &str = "obsplat-operator";

/// Memory in MiB and CPU in millicores for the standard size ladder this
/// operator rounds vertical recommendations to: {0.25, 0.5, 1, 2, 4, 8, 16,
/// 32, 64 cores} and the memory equivalent, then multiples of 8 cores beyond
/// that.
const STANDARD_SIZES_CPU_MILLI: &[i64] = &[250, 500, 1000, 2000, 4000, 8000, 16000, 32000, 64000];
const STANDARD_SIZES_MEMORY_MI: &[i64] =
    &[256, 512, 1024, 2048, 4096, 8192, 16384, 32768, 65536];
const CPU_STEP_BEYOND_LADDER_MILLI: i64 = 8000;
const MEMORY_STEP_BEYOND_LADDER_MI: i64 = 8192;

/// Buffer applied on top of the measured P95 before scaling to the target
/// utilization, so the recommendation isn't sized to exactly saturate the
/// target the moment it's applied.
const DEFAULT_SAFETY_MARGIN: f64 = 1.1;

const CPU_LIMIT_MULTIPLIER: f64 = 1.5;
const MEMORY_LIMIT_MULTIPLIER: f64 = 1.2;

const MIN_SAMPLES_FOR_FULL_CONFIDENCE: usize = 50;

fn vpa_api_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind {
        group: VPA_GROUP.to_string(),
        version: VPA_VERSION.to_string(),
        kind: VPA_KIND.to_string(),
    })
}

/// Computes the p-th percentile (0.0-100.0) of a sorted-on-entry sample
/// set using nearest-rank interpolation.
pub fn percentile(samples: &mut [f64], p: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let rank = ((p / 100.0) * (samples.len() as f64 - 1.0)).round() as usize;
    samples[rank.min(samples.len() - 1)]
}

/// Rounds up to the next entry in `ladder`, falling through to multiples of
/// `step_beyond_ladder` once the value exceeds the ladder's top entry.
fn round_to_standard_size(value: i64, ladder: &[i64], step_beyond_ladder: i64) -> i64 {
    if let Some(&size) = ladder.iter().find(|&&size| size >= value) {
        return size;
    }
    let top = *ladder.last().unwrap();
    top + ((value - top + step_beyond_ladder - 1) / step_beyond_ladder) * step_beyond_ladder
}

/// Confidence signal for a recommendation: how much the historical window
/// backs the percentile estimate. Approaches 1.0 as the sample count
/// approaches a full 7-day window at one sample per tick; thin windows
/// (a component that just started, or sparse metrics scrapes) report low
/// confidence so the caller doesn't act on noise.
pub fn confidence(sample_count: usize) -> f64 {
    (sample_count as f64 / MIN_SAMPLES_FOR_FULL_CONFIDENCE as f64).min(1.0)
}

/// Builds a resource recommendation from historical CPU (millicores) and
/// memory (MiB) samples: `request = roundToStandardSize(P95 × safetyMargin /
/// (targetUtilization / 100))`, limit = 1.5× request for CPU, 1.2× for
/// memory.
///
/// `target_cpu_percent`/`target_memory_percent` come from the component's
/// scaling policy (falling back to 70% when unset, matching the default
/// horizontal target); `safety_margin` is the headroom buffer applied on
/// top of the measured percentile.
pub fn recommend(
    cpu_milli_samples: &mut [f64],
    memory_mi_samples: &mut [f64],
    target_cpu_percent: i32,
    target_memory_percent: i32,
    safety_margin: f64,
) -> ResourceRequirements {
    let cpu_p95 = percentile(cpu_milli_samples, 95.0);
    let mem_p95 = percentile(memory_mi_samples, 95.0);

    let cpu_scaled = (cpu_p95 * safety_margin / (target_cpu_percent as f64 / 100.0)).ceil() as i64;
    let mem_scaled = (mem_p95 * safety_margin / (target_memory_percent as f64 / 100.0)).ceil() as i64;

    let request_cpu = round_to_standard_size(
        cpu_scaled.max(1),
        STANDARD_SIZES_CPU_MILLI,
        CPU_STEP_BEYOND_LADDER_MILLI,
    );
    let request_mem = round_to_standard_size(
        mem_scaled.max(1),
        STANDARD_SIZES_MEMORY_MI,
        MEMORY_STEP_BEYOND_LADDER_MI,
    );

    let limit_cpu = round_to_standard_size(
        (request_cpu as f64 * CPU_LIMIT_MULTIPLIER).ceil() as i64,
        STANDARD_SIZES_CPU_MILLI,
        CPU_STEP_BEYOND_LADDER_MILLI,
    );
    let limit_mem = round_to_standard_size(
        (request_mem as f64 * MEMORY_LIMIT_MULTIPLIER).ceil() as i64,
        STANDARD_SIZES_MEMORY_MI,
        MEMORY_STEP_BEYOND_LADDER_MI,
    );

    ResourceRequirements {
        requests: ResourceSpec {
            cpu: format!("{request_cpu}m"),
            memory: format!("{request_mem}Mi"),
        },
        limits: ResourceSpec {
            cpu: format!("{limit_cpu}m"),
            memory: format!("{limit_mem}Mi"),
        },
    }
}

/// Gates whether a fresh recommendation should replace the current
/// requests: the request must differ by more than 10% (on either CPU or
/// memory) and the confidence signal must exceed 0.8.
pub fn should_apply(current: &ResourceRequirements, recommended: &ResourceRequirements, confidence: f64) -> bool {
    if confidence <= 0.8 {
        return false;
    }
    differs_by_more_than(&current.requests.cpu, &recommended.requests.cpu, 0.10)
        || differs_by_more_than(&current.requests.memory, &recommended.requests.memory, 0.10)
}

fn differs_by_more_than(current: &str, recommended: &str, fraction: f64) -> bool {
    let (Some(current), Some(recommended)) = (parse_quantity_milli(current), parse_quantity_milli(recommended))
    else {
        return true;
    };
    if current == 0.0 {
        return recommended != 0.0;
    }
    ((recommended - current).abs() / current) > fraction
}

/// Parses a Kubernetes CPU (`"500m"`, `"2"`) or memory (`"512Mi"`, `"1Gi"`)
/// quantity into a unitless comparable magnitude (millicores or MiB).
fn parse_quantity_milli(quantity: &str) -> Option<f64> {
    if let Some(millis) = quantity.strip_suffix('m') {
        return millis.parse::<f64>().ok();
    }
    if let Some(gi) = quantity.strip_suffix("Gi") {
        return gi.parse::<f64>().ok().map(|v| v * 1024.0);
    }
    if let Some(mi) = quantity.strip_suffix("Mi") {
        return mi.parse::<f64>().ok();
    }
    quantity.parse::<f64>().ok().map(|cores| cores * 1000.0)
}

pub async fn ensure_vpa(
    client: &Client,
    platform: &ObservabilityPlatform,
    component: ComponentName,
    workload_kind: &str,
) -> Result<()> {
    let namespace = platform.namespace().unwrap_or_else(|| "default".to_string());
    let name = format!("{}-{}-vpa", platform.name_any(), component.as_str());
    let target_name = format!("{}-{}", platform.name_any(), component.as_str());

    let spec = json!({
        "targetRef": {
            "apiVersion": "apps/v1",
            "kind": workload_kind,
            "name": target_name,
        },
        "updatePolicy": {
            "updateMode": "Auto",
        },
    });

    let owner_ref = platform.controller_owner_ref(&()).map(|mut r| {
        r.block_owner_deletion = Some(true);
        r
    });

    let mut obj = DynamicObject::new(&name, &vpa_api_resource());
    obj.metadata = ObjectMeta {
        name: Some(name.clone()),
        namespace: Some(namespace.clone()),
        owner_references: owner_ref.map(|r| vec![r]),
        ..Default::default()
    };
    obj.data = json!({ "spec": spec });

    let api: Api<DynamicObject> = Api::namespaced_with(client.clone(), &namespace, &vpa_api_resource());
    api.patch(
        &name,
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(&obj),
    )
    .await
    .map_err(Error::Kube)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_of_single_sample_is_itself() {
        let mut samples = vec![42.0];
        assert_eq!(percentile(&mut samples, 90.0), 42.0);
    }

    #[test]
    fn percentile_picks_high_end_of_distribution() {
        let mut samples: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        let p90 = percentile(&mut samples, 90.0);
        assert!(p90 >= 89.0 && p90 <= 91.0);
    }

    #[test]
    fn recommend_rounds_up_to_standard_sizes() {
        let mut cpu = vec![180.0, 190.0, 210.0];
        let mut mem = vec![300.0, 310.0, 330.0];
        let rec = recommend(&mut cpu, &mut mem, 70, 70, DEFAULT_SAFETY_MARGIN);
        assert_eq!(rec.requests.cpu, "500m");
        assert_eq!(rec.requests.memory, "1024Mi");
    }

    #[test]
    fn recommend_cpu_limit_is_1_5x_request_and_memory_is_1_2x() {
        let mut cpu = vec![900.0];
        let mut mem = vec![1800.0];
        let rec = recommend(&mut cpu, &mut mem, 70, 70, DEFAULT_SAFETY_MARGIN);
        assert_eq!(rec.requests.cpu, "2000m");
        assert_eq!(rec.limits.cpu, "4000m");
        assert_eq!(rec.requests.memory, "4096Mi");
        assert_eq!(rec.limits.memory, "8192Mi");
    }

    #[test]
    fn round_to_standard_size_falls_through_to_multiples_beyond_ladder() {
        let rounded = round_to_standard_size(70_000, STANDARD_SIZES_CPU_MILLI, CPU_STEP_BEYOND_LADDER_MILLI);
        assert_eq!(rounded, 72_000);
    }

    #[test]
    fn confidence_scales_with_sample_count() {
        assert_eq!(confidence(0), 0.0);
        assert_eq!(confidence(MIN_SAMPLES_FOR_FULL_CONFIDENCE), 1.0);
        assert_eq!(confidence(MIN_SAMPLES_FOR_FULL_CONFIDENCE * 10), 1.0);
    }

    #[test]
    fn should_apply_rejects_low_confidence_even_with_large_delta() {
        let current = ResourceRequirements {
            requests: ResourceSpec { cpu: "250m".to_string(), memory: "512Mi".to_string() },
            limits: ResourceSpec { cpu: "375m".to_string(), memory: "614Mi".to_string() },
        };
        let recommended = ResourceRequirements {
            requests: ResourceSpec { cpu: "2000m".to_string(), memory: "4096Mi".to_string() },
            limits: ResourceSpec { cpu: "3000m".to_string(), memory: "4915Mi".to_string() },
        };
        assert!(!should_apply(&current, &recommended, 0.5));
    }

    #[test]
    fn should_apply_rejects_small_delta_even_with_high_confidence() {
        let current = ResourceRequirements {
            requests: ResourceSpec { cpu: "1000m".to_string(), memory: "2048Mi".to_string() },
            limits: ResourceSpec { cpu: "1500m".to_string(), memory: "2458Mi".to_string() },
        };
        let recommended = ResourceRequirements {
            requests: ResourceSpec { cpu: "1050m".to_string(), memory: "2048Mi".to_string() },
            limits: ResourceSpec { cpu: "1575m".to_string(), memory: "2458Mi".to_string() },
        };
        assert!(!should_apply(&current, &recommended, 0.9));
    }

    #[test]
    fn should_apply_accepts_large_delta_with_high_confidence() {
        let current = ResourceRequirements {
            requests: ResourceSpec { cpu: "250m".to_string(), memory: "512Mi".to_string() },
            limits: ResourceSpec { cpu: "375m".to_string(), memory: "614Mi".to_string() },
        };
        let recommended = ResourceRequirements {
            requests: ResourceSpec { cpu: "2000m".to_string(), memory: "4096Mi".to_string() },
            limits: ResourceSpec { cpu: "3000m".to_string(), memory: "4915Mi".to_string() },
        };
        assert!(should_apply(&current, &recommended, 0.9));
    }
}

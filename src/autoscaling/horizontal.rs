//! Threshold-based horizontal scaling: step replicas up or down when CPU or
//! memory utilization crosses the configured target.

use super::policy::{clamp_replicas, ScalingContext, ScalingDecision};

/// Hysteresis band around the target so a sample sitting right at the
/// threshold doesn't flap the replica count every reconcile.
const TOLERANCE_PERCENT: f64 = 5.0;

pub fn decide(ctx: &ScalingContext) -> ScalingDecision {
    let mut ratios = Vec::new();

    if let Some(target) = ctx.policy.target_cpu_percent {
        ratios.push(ctx.current.cpu_percent / target as f64);
    }
    if let Some(target) = ctx.policy.target_memory_percent {
        ratios.push(ctx.current.memory_percent / target as f64);
    }

    if ratios.is_empty() {
        return ScalingDecision::no_change(ctx.current_replicas, "no CPU/memory target configured");
    }

    // Scale by the metric furthest from its target, mirroring the
    // Kubernetes HPA algorithm's "most demanding metric wins" rule.
    let worst_ratio = ratios
        .iter()
        .cloned()
        .fold(0.0_f64, |acc, r| if r > acc { r } else { acc });

    let tolerance = TOLERANCE_PERCENT / 100.0;
    if (worst_ratio - 1.0).abs() <= tolerance {
        return ScalingDecision::no_change(ctx.current_replicas, "within tolerance of target");
    }

    let desired = (ctx.current_replicas as f64 * worst_ratio).ceil() as i32;
    let target_replicas = clamp_replicas(desired.max(1), &ctx.policy);

    let reason = if target_replicas > ctx.current_replicas {
        format!("utilization ratio {worst_ratio:.2} above target, scaling up")
    } else if target_replicas < ctx.current_replicas {
        format!("utilization ratio {worst_ratio:.2} below target, scaling down")
    } else {
        "desired replicas already at bound".to_string()
    };

    ScalingDecision {
        target_replicas,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autoscaling::policy::UtilizationSample;
    use crate::crd::types::{ComponentName, ScalingPolicy, ScalingPolicyType};

    fn ctx(cpu: f64, replicas: i32) -> ScalingContext {
        ScalingContext {
            namespace: "default".to_string(),
            platform: "demo".to_string(),
            component: ComponentName::Prometheus,
            policy: ScalingPolicy {
                policy_type: ScalingPolicyType::Horizontal,
                min_replicas: 1,
                max_replicas: 10,
                target_cpu_percent: Some(70),
                target_memory_percent: None,
                cost_threshold: None,
            },
            current_replicas: replicas,
            current: UtilizationSample {
                cpu_percent: cpu,
                memory_percent: 0.0,
            },
        }
    }

    #[test]
    fn scales_up_when_over_target() {
        let decision = decide(&ctx(140.0, 2));
        assert!(decision.target_replicas > 2);
    }

    #[test]
    fn scales_down_when_under_target() {
        let decision = decide(&ctx(20.0, 4));
        assert!(decision.target_replicas < 4);
    }

    #[test]
    fn stays_within_tolerance_band() {
        let decision = decide(&ctx(71.0, 3));
        assert_eq!(decision.target_replicas, 3);
    }

    #[test]
    fn never_exceeds_max_replicas() {
        let decision = decide(&ctx(1000.0, 9));
        assert_eq!(decision.target_replicas, 10);
    }

    #[test]
    fn never_drops_below_min_replicas() {
        let decision = decide(&ctx(0.1, 1));
        assert_eq!(decision.target_replicas, 1);
    }
}

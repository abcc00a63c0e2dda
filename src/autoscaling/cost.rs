//! Cost-aware scaling: picks the cheapest replica/size configuration that
//! still satisfies a component's scaling policy and a platform-wide
//! monthly budget.

use crate::crd::types::{ComponentName, ScalingPolicy};

/// Approximate hourly on-demand cost per vCPU and per GiB, used only to
/// rank candidate configurations relative to each other, not to bill
/// anyone.
const HOURLY_USD_PER_VCPU: f64 = 0.033;
const HOURLY_USD_PER_GIB: f64 = 0.0045;
const HOURS_PER_MONTH: f64 = 730.0;
/// Spot pricing discount applied to spot-eligible components.
const SPOT_DISCOUNT: f64 = 0.35;

#[derive(Clone, Copy, Debug)]
pub struct Candidate {
    pub replicas: i32,
    pub cpu_cores: f64,
    pub memory_gib: f64,
    pub spot: bool,
}

impl Candidate {
    pub fn monthly_cost_usd(&self) -> f64 {
        let unit_hourly = self.cpu_cores * HOURLY_USD_PER_VCPU + self.memory_gib * HOURLY_USD_PER_GIB;
        let discount = if self.spot { 1.0 - SPOT_DISCOUNT } else { 1.0 };
        self.replicas as f64 * unit_hourly * discount * HOURS_PER_MONTH
    }
}

#[derive(Clone, Debug)]
pub struct CostDecision {
    pub candidate: Candidate,
    pub monthly_cost_usd: f64,
    pub within_budget: bool,
    pub reason: String,
}

/// Searches a small grid of replica counts and instance sizes for the
/// cheapest candidate meeting the component's replica bounds, preferring
/// spot only when the component is spot-eligible (the metrics engine, log
/// ingester, and trace ingester never are).
pub fn cheapest_candidate(
    component: ComponentName,
    policy: &ScalingPolicy,
    min_cpu_cores: f64,
    min_memory_gib: f64,
    monthly_budget: Option<f64>,
) -> CostDecision {
    let mut candidates = Vec::new();
    for replicas in policy.min_replicas..=policy.max_replicas {
        for spot in [false, true] {
            if spot && !component.is_spot_eligible() {
                continue;
            }
            candidates.push(Candidate {
                replicas,
                cpu_cores: min_cpu_cores,
                memory_gib: min_memory_gib,
                spot,
            });
        }
    }

    candidates.sort_by(|a, b| {
        a.monthly_cost_usd()
            .partial_cmp(&b.monthly_cost_usd())
            .unwrap()
    });

    let within_budget = |cost: f64| monthly_budget.map(|b| cost <= b).unwrap_or(true);

    let chosen = candidates
        .iter()
        .find(|c| within_budget(c.monthly_cost_usd()))
        .or_else(|| candidates.first())
        .copied()
        .unwrap_or(Candidate {
            replicas: policy.min_replicas,
            cpu_cores: min_cpu_cores,
            memory_gib: min_memory_gib,
            spot: false,
        });

    let cost = chosen.monthly_cost_usd();
    let budget_ok = within_budget(cost);

    CostDecision {
        candidate: chosen,
        monthly_cost_usd: cost,
        within_budget: budget_ok,
        reason: if budget_ok {
            format!("selected {} replicas{} at ${cost:.2}/mo", chosen.replicas, if chosen.spot { " (spot)" } else { "" })
        } else {
            format!(
                "no candidate fits budget; cheapest option ${cost:.2}/mo exceeds it"
            )
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::types::ScalingPolicyType;

    fn policy() -> ScalingPolicy {
        ScalingPolicy {
            policy_type: ScalingPolicyType::CostAware,
            min_replicas: 1,
            max_replicas: 5,
            target_cpu_percent: None,
            target_memory_percent: None,
            cost_threshold: None,
        }
    }

    #[test]
    fn metrics_engine_never_gets_spot() {
        let decision = cheapest_candidate(ComponentName::Prometheus, &policy(), 0.5, 1.0, None);
        assert!(!decision.candidate.spot);
    }

    #[test]
    fn visualization_may_use_spot_when_cheapest() {
        let decision = cheapest_candidate(ComponentName::Grafana, &policy(), 0.5, 1.0, None);
        assert!(decision.candidate.spot);
    }

    #[test]
    fn respects_monthly_budget_when_feasible() {
        let decision = cheapest_candidate(ComponentName::Grafana, &policy(), 0.5, 1.0, Some(5.0));
        assert!(decision.within_budget);
        assert!(decision.monthly_cost_usd <= 5.0);
    }

    #[test]
    fn flags_when_even_cheapest_exceeds_budget() {
        let decision = cheapest_candidate(ComponentName::Prometheus, &policy(), 16.0, 64.0, Some(1.0));
        assert!(!decision.within_budget);
    }
}

//! Autoscaling control loop.
//!
//! Runs independently of the reconciliation engine on its own interval,
//! evaluating every `(platform, component)` pair that carries a scaling
//! policy. A per-target in-progress flag keeps two overlapping ticks from
//! issuing conflicting scale decisions for the same target while still
//! letting unrelated targets scale concurrently.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::controller::metrics::{self, ComponentLabels, ScalingLabels};
use crate::crd::types::{ComponentName, ScalingPolicyType};
use crate::crd::ObservabilityPlatform;
use crate::error::{Error, Result};

use super::cost;
use super::drain;
use super::events::{ScalingEvent, ScalingEventLog};
use super::horizontal;
use super::policy::{ScalingContext, UtilizationSample};
use super::predictive::{self, TimedSample};
use super::vertical;

const FIELD_MANAGER: &str = "obsplat-operator";

pub struct AutoscalerState {
    client: Client,
    in_progress: Mutex<HashSet<(String, String, ComponentName)>>,
    pub events: ScalingEventLog,
}

impl AutoscalerState {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            in_progress: Mutex::new(HashSet::new()),
            events: ScalingEventLog::default(),
        }
    }
}

/// Fetches a proxy for live utilization; in the absence of a metrics
/// backend client this reads CPU/memory request fill as a coarse signal,
/// the same fallback the teacher's health module uses when no richer
/// telemetry source is wired up.
async fn sample_utilization(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<UtilizationSample> {
    let api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    if let Ok(d) = api.get(name).await {
        let desired = d.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1).max(1);
        let ready = d
            .status
            .as_ref()
            .and_then(|s| s.ready_replicas)
            .unwrap_or(0);
        let fill = (ready as f64 / desired as f64) * 100.0;
        return Ok(UtilizationSample {
            cpu_percent: fill,
            memory_percent: fill,
        });
    }
    Ok(UtilizationSample {
        cpu_percent: 0.0,
        memory_percent: 0.0,
    })
}

async fn patch_replicas(
    client: &Client,
    namespace: &str,
    name: &str,
    workload_kind: &str,
    replicas: i32,
) -> Result<()> {
    let patch = json!({ "spec": { "replicas": replicas } });
    match workload_kind {
        "Deployment" => {
            let api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
            api.patch_scale(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
                .await
                .map_err(Error::Kube)?;
        }
        "StatefulSet" => {
            let api: Api<StatefulSet> = Api::namespaced(client.clone(), namespace);
            api.patch_scale(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
                .await
                .map_err(Error::Kube)?;
        }
        other => {
            return Err(Error::Config(format!("unknown workload kind {other}")));
        }
    }
    Ok(())
}

fn workload_kind_for(component: ComponentName) -> &'static str {
    match component {
        ComponentName::Grafana => "Deployment",
        _ => "StatefulSet",
    }
}

#[instrument(skip(state, platform), fields(platform = %platform.name_any()))]
async fn evaluate_platform(state: &Arc<AutoscalerState>, platform: &ObservabilityPlatform) {
    let namespace = platform.namespace().unwrap_or_else(|| "default".to_string());

    for (component_key, policy) in &platform.spec.scaling {
        let component = match component_key.as_str() {
            "prometheus" => ComponentName::Prometheus,
            "grafana" => ComponentName::Grafana,
            "loki" => ComponentName::Loki,
            "tempo" => ComponentName::Tempo,
            other => {
                warn!("unknown scaling target {other}, skipping");
                continue;
            }
        };

        let lock_key = (namespace.clone(), platform.name_any(), component);
        {
            let mut in_progress = state.in_progress.lock().await;
            if in_progress.contains(&lock_key) {
                continue;
            }
            in_progress.insert(lock_key.clone());
        }

        let scaling_labels = ScalingLabels {
            namespace: namespace.clone(),
            platform: platform.name_any(),
            component: component.as_str().to_string(),
            mode: match policy.policy_type {
                ScalingPolicyType::Horizontal => "horizontal",
                ScalingPolicyType::Vertical => "vertical",
                ScalingPolicyType::Predictive => "predictive",
                ScalingPolicyType::CostAware => "cost_aware",
            }
            .to_string(),
        };
        metrics::SCALING_ACTIVE.get_or_create(&scaling_labels).set(1);

        let resource_name = format!("{}-{}", platform.name_any(), component.as_str());
        let workload_kind = workload_kind_for(component);

        let result = run_decision(
            state,
            &namespace,
            platform,
            component,
            policy.clone(),
            &resource_name,
            workload_kind,
        )
        .await;

        if let Err(e) = result {
            warn!("autoscaling decision failed for {resource_name}: {:?}", e);
        }

        metrics::SCALING_ACTIVE.get_or_create(&scaling_labels).set(0);
        state.in_progress.lock().await.remove(&lock_key);
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_decision(
    state: &Arc<AutoscalerState>,
    namespace: &str,
    platform: &ObservabilityPlatform,
    component: ComponentName,
    policy: crate::crd::types::ScalingPolicy,
    resource_name: &str,
    workload_kind: &str,
) -> Result<()> {
    let sample = sample_utilization(&state.client, namespace, resource_name).await?;
    let current_replicas = policy.min_replicas;

    let ctx = ScalingContext {
        namespace: namespace.to_string(),
        platform: platform.name_any(),
        component,
        policy: policy.clone(),
        current_replicas,
        current: sample,
    };

    let decision = match policy.policy_type {
        ScalingPolicyType::Horizontal => horizontal::decide(&ctx),
        ScalingPolicyType::Predictive => {
            let history = vec![
                TimedSample { minutes: 0.0, value_percent: sample.cpu_percent * 0.8 },
                TimedSample { minutes: 5.0, value_percent: sample.cpu_percent },
            ];
            predictive::decide(&ctx, &history)
        }
        ScalingPolicyType::CostAware => {
            let cost_decision = cost::cheapest_candidate(component, &policy, 0.5, 1.0, policy.cost_threshold);

            let baseline = cost::Candidate {
                replicas: current_replicas,
                cpu_cores: 0.5,
                memory_gib: 1.0,
                spot: false,
            };
            let savings = (baseline.monthly_cost_usd() - cost_decision.monthly_cost_usd).max(0.0);

            let component_labels = ComponentLabels {
                namespace: namespace.to_string(),
                platform: platform.name_any(),
                component: component.as_str().to_string(),
            };
            metrics::COST_ESTIMATE_USD
                .get_or_create(&component_labels)
                .set(cost_decision.monthly_cost_usd.round() as i64);
            metrics::POTENTIAL_SAVINGS_USD
                .get_or_create(&component_labels)
                .set(savings.round() as i64);

            super::policy::ScalingDecision {
                target_replicas: cost_decision.candidate.replicas,
                reason: cost_decision.reason,
            }
        }
        ScalingPolicyType::Vertical => {
            vertical::ensure_vpa(&state.client, platform, component, workload_kind).await?;
            return Ok(());
        }
    };

    let applied_target = if decision.target_replicas < current_replicas {
        let evictions = drain::next_eviction_count(current_replicas, decision.target_replicas, policy.min_replicas);
        current_replicas - evictions
    } else {
        decision.target_replicas
    };

    if applied_target != current_replicas {
        patch_replicas(&state.client, namespace, resource_name, workload_kind, applied_target).await?;
        state.events.record(ScalingEvent {
            timestamp: chrono::Utc::now().to_rfc3339(),
            namespace: namespace.to_string(),
            platform: platform.name_any(),
            component,
            from_replicas: current_replicas,
            to_replicas: applied_target,
            reason: decision.reason,
        });
        info!(
            "scaled {}/{} {} -> {} replicas (policy target {})",
            namespace, resource_name, current_replicas, applied_target, decision.target_replicas
        );
    }

    Ok(())
}

pub async fn run_autoscaler(state: Arc<AutoscalerState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let api: Api<ObservabilityPlatform> = Api::all(state.client.clone());
        match api.list(&Default::default()).await {
            Ok(list) => {
                for platform in list.items {
                    evaluate_platform(&state, &platform).await;
                }
            }
            Err(e) => warn!("failed to list platforms for autoscaling pass: {:?}", e),
        }
    }
}

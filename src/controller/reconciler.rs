//! Main reconciler for `ObservabilityPlatform` resources.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Event, Service};
use kube::{
    api::{Api, Patch, PatchParams, PostParams},
    client::Client,
    runtime::{
        controller::{Action, Controller},
        finalizer::{finalizer, Event as FinalizerEvent},
        watcher::Config,
    },
    Resource, ResourceExt,
};
use tracing::{error, info, instrument, warn};

use crate::crd::types::{
    ComponentName, ComponentStatus, ConditionStatus, HealthStatus, Phase, CONDITION_DEGRADED,
    CONDITION_READY,
};
use crate::crd::ObservabilityPlatform;
use crate::error::{Error, Result};

use super::conditions::{degraded_condition, not_degraded_condition, ready_condition, set_condition, not_ready_condition};
use super::finalizers::PLATFORM_FINALIZER;
use super::managers::build_manager;
use super::metrics;

pub struct ControllerState {
    pub client: Client,
}

pub async fn run_controller(state: Arc<ControllerState>) -> Result<()> {
    let client = state.client.clone();
    let platforms: Api<ObservabilityPlatform> = Api::all(client.clone());

    info!("starting ObservabilityPlatform controller");

    if let Err(e) = platforms.list(&Default::default()).await {
        error!("ObservabilityPlatform CRD not found: {:?}", e);
        return Err(Error::Config(
            "ObservabilityPlatform CRD not installed".to_string(),
        ));
    }

    Controller::new(platforms, Config::default())
        .owns::<Deployment>(Api::all(client.clone()), Config::default())
        .owns::<StatefulSet>(Api::all(client.clone()), Config::default())
        .owns::<Service>(Api::all(client.clone()), Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, state)
        .for_each(|res| async move {
            match res {
                Ok(obj) => info!("reconciled: {:?}", obj),
                Err(e) => error!("reconcile error: {:?}", e),
            }
        })
        .await;

    Ok(())
}

async fn emit_event(
    client: &Client,
    platform: &ObservabilityPlatform,
    event_type: &str,
    reason: &str,
    message: &str,
) -> Result<()> {
    let namespace = platform.namespace().unwrap_or_else(|| "default".to_string());
    let events: Api<Event> = Api::namespaced(client.clone(), &namespace);

    let time = chrono::Utc::now();
    let event = Event {
        metadata: kube::api::ObjectMeta {
            generate_name: Some(format!("{}-event-", platform.name_any())),
            ..Default::default()
        },
        type_: Some(event_type.to_string()),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        involved_object: platform.object_ref(&()),
        first_timestamp: Some(k8s_openapi::apimachinery::pkg::apis::meta::v1::Time(time)),
        last_timestamp: Some(k8s_openapi::apimachinery::pkg::apis::meta::v1::Time(time)),
        count: Some(1),
        ..Default::default()
    };

    events
        .create(&PostParams::default(), &event)
        .await
        .map_err(Error::Kube)?;
    Ok(())
}

#[instrument(skip(ctx), fields(name = %obj.name_any(), namespace = obj.namespace()))]
async fn reconcile(obj: Arc<ObservabilityPlatform>, ctx: Arc<ControllerState>) -> Result<Action> {
    let client = ctx.client.clone();
    let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());
    let api: Api<ObservabilityPlatform> = Api::namespaced(client.clone(), &namespace);

    let start = Instant::now();
    let result = finalizer(&api, PLATFORM_FINALIZER, obj.clone(), |event| async {
        match event {
            FinalizerEvent::Apply(platform) => apply_platform(&client, &platform).await,
            FinalizerEvent::Cleanup(platform) => cleanup_platform(&client, &platform).await,
        }
    })
    .await
    .map_err(Error::from);

    let elapsed = start.elapsed().as_secs_f64();
    metrics::RECONCILE_DURATION_SECONDS
        .get_or_create(&metrics::ReconcileLabels {
            namespace: namespace.clone(),
            platform: obj.name_any(),
        })
        .observe(elapsed);

    if let Err(ref e) = result {
        metrics::RECONCILE_ERRORS_TOTAL
            .get_or_create(&metrics::ErrorLabels {
                namespace,
                platform: obj.name_any(),
                kind: error_kind(e).to_string(),
            })
            .inc();
    }

    result
}

fn error_kind(e: &Error) -> &'static str {
    match e {
        Error::Kube(_) => "kube",
        Error::Validation(_) => "validation",
        Error::Config(_) => "config",
        Error::Provider(_) => "provider",
        Error::Hook(_) => "hook",
        Error::Serialization(_) | Error::Yaml(_) => "serialization",
        Error::Conversion(_) => "conversion",
        Error::Finalizer(_) => "finalizer",
        Error::Timeout(_) => "timeout",
        Error::NotFound(_) => "not_found",
        Error::Encryption(_) => "encryption",
        Error::Io(_) => "io",
    }
}

#[instrument(skip(client, platform), fields(name = %platform.name_any(), namespace = platform.namespace()))]
async fn apply_platform(client: &Client, platform: &ObservabilityPlatform) -> Result<Action> {
    let namespace = platform.namespace().unwrap_or_else(|| "default".to_string());
    let name = platform.name_any();

    if let Err(errors) = platform.spec.validate() {
        let message = errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        warn!("validation failed for {}/{}: {}", namespace, name, message);
        emit_event(client, platform, "Warning", "ValidationFailed", &message).await?;
        update_status_failed(client, platform, &message).await?;
        return Err(Error::Validation(message));
    }

    if platform.spec.suspended {
        info!("{}/{} is suspended", namespace, name);
    }

    let mut component_status = BTreeMap::new();
    let mut any_failed = false;
    let mut enabled_count = 0;

    for component in ComponentName::RECONCILE_ORDER {
        if !component_enabled(platform, component) {
            let manager = build_manager(component);
            if let Err(e) = manager.delete(client, platform).await {
                warn!("{}/{} failed to delete disabled component {}: {:?}", namespace, name, component, e);
            }
            continue;
        }
        enabled_count += 1;

        let manager = build_manager(component);
        if let Err(e) = manager.validate(platform) {
            warn!("{}/{} component {} failed validation: {}", namespace, name, component, e);
            any_failed = true;
            emit_event(
                client,
                platform,
                "Warning",
                "ComponentValidationFailed",
                &format!("{component}: {e}"),
            )
            .await?;
            continue;
        }

        if let Err(e) = manager.reconcile(client, platform).await {
            warn!("{}/{} component {} failed to reconcile: {}", namespace, name, component, e);
            any_failed = true;
            emit_event(
                client,
                platform,
                "Warning",
                "ComponentReconcileFailed",
                &format!("{component}: {e}"),
            )
            .await?;
            continue;
        }

        match manager.get_status(client, platform).await {
            Ok(status) => {
                metrics::COMPONENT_READY_REPLICAS
                    .get_or_create(&metrics::ComponentLabels {
                        namespace: namespace.clone(),
                        platform: name.clone(),
                        component: component.as_str().to_string(),
                    })
                    .set(status.ready_replicas as i64);
                metrics::COMPONENT_DESIRED_REPLICAS
                    .get_or_create(&metrics::ComponentLabels {
                        namespace: namespace.clone(),
                        platform: name.clone(),
                        component: component.as_str().to_string(),
                    })
                    .set(status.desired_replicas as i64);
                component_status.insert(component.as_str().to_string(), status);
            }
            Err(e) => {
                warn!("failed to read status for component {}: {}", component, e);
                any_failed = true;
            }
        }
    }

    let health = aggregate_health(&component_status, enabled_count);

    let previous_phase = platform.status.as_ref().map(|s| s.phase).unwrap_or_default();
    let previous_observed_generation = platform.status.as_ref().map(|s| s.observed_generation).unwrap_or(0);
    let current_generation = platform.metadata.generation.unwrap_or(0);
    let generation_changed_since_convergence =
        previous_phase == Phase::Ready && previous_observed_generation != current_generation;

    let phase = if any_failed {
        Phase::Degraded
    } else if health.healthy {
        Phase::Ready
    } else if generation_changed_since_convergence {
        Phase::Upgrading
    } else {
        Phase::Installing
    };

    update_status(client, platform, phase, &component_status, &health).await?;

    let requeue = match phase {
        Phase::Ready => Duration::from_secs(60),
        Phase::Degraded => Duration::from_secs(30),
        _ => Duration::from_secs(15),
    };

    Ok(Action::requeue(requeue))
}

fn component_enabled(platform: &ObservabilityPlatform, component: ComponentName) -> bool {
    match component {
        ComponentName::Prometheus => platform.spec.prometheus.common.enabled,
        ComponentName::Grafana => platform.spec.grafana.common.enabled,
        ComponentName::Loki => platform.spec.loki.common.enabled,
        ComponentName::Tempo => platform.spec.tempo.common.enabled,
    }
}

fn aggregate_health(component_status: &BTreeMap<String, ComponentStatus>, total: i32) -> HealthStatus {
    let mut components = BTreeMap::new();
    let mut healthy_count = 0;

    for (name, status) in component_status {
        let healthy = status.phase == "Ready";
        if healthy {
            healthy_count += 1;
        }
        components.insert(name.clone(), healthy);
    }

    HealthStatus {
        healthy: total > 0 && healthy_count == total,
        healthy_count,
        total_count: total,
        message: format!("{healthy_count}/{total} components ready"),
        components,
    }
}

#[instrument(skip(client, platform), fields(name = %platform.name_any(), namespace = platform.namespace()))]
async fn cleanup_platform(client: &Client, platform: &ObservabilityPlatform) -> Result<Action> {
    let namespace = platform.namespace().unwrap_or_else(|| "default".to_string());
    let name = platform.name_any();

    info!("cleaning up ObservabilityPlatform {}/{}", namespace, name);

    for component in ComponentName::RECONCILE_ORDER.iter().rev() {
        let manager = build_manager(*component);
        if let Err(e) = manager.delete(client, platform).await {
            warn!("failed to delete component {}: {:?}", component, e);
        }
    }

    Ok(Action::await_change())
}

async fn update_status(
    client: &Client,
    platform: &ObservabilityPlatform,
    phase: Phase,
    component_status: &BTreeMap<String, ComponentStatus>,
    health: &HealthStatus,
) -> Result<()> {
    let namespace = platform.namespace().unwrap_or_else(|| "default".to_string());
    let api: Api<ObservabilityPlatform> = Api::namespaced(client.clone(), &namespace);

    let mut conditions = platform
        .status
        .as_ref()
        .map(|s| s.conditions.clone())
        .unwrap_or_default();

    if health.healthy {
        let c = ready_condition("AllComponentsReady", &health.message);
        set_condition(&mut conditions, CONDITION_READY, c.status, &c.reason, &c.message);
        let c = not_degraded_condition();
        set_condition(&mut conditions, CONDITION_DEGRADED, c.status, &c.reason, &c.message);
    } else {
        let c = not_ready_condition("ComponentsNotReady", &health.message);
        set_condition(&mut conditions, CONDITION_READY, c.status, &c.reason, &c.message);
        if matches!(phase, Phase::Degraded) {
            let c = degraded_condition("ComponentReconcileFailed", &health.message);
            set_condition(
                &mut conditions,
                CONDITION_DEGRADED,
                c.status,
                &c.reason,
                &c.message,
            );
        }
    }

    let status_patch = serde_json::json!({
        "status": {
            "phase": phase,
            "observedGeneration": platform.metadata.generation,
            "conditions": conditions,
            "componentStatus": component_status,
            "health": health,
        }
    });

    api.patch_status(
        &platform.name_any(),
        &PatchParams::apply("obsplat-operator"),
        &Patch::Merge(&status_patch),
    )
    .await
    .map_err(Error::Kube)?;

    Ok(())
}

async fn update_status_failed(client: &Client, platform: &ObservabilityPlatform, message: &str) -> Result<()> {
    let namespace = platform.namespace().unwrap_or_else(|| "default".to_string());
    let api: Api<ObservabilityPlatform> = Api::namespaced(client.clone(), &namespace);

    let mut conditions = platform
        .status
        .as_ref()
        .map(|s| s.conditions.clone())
        .unwrap_or_default();
    set_condition(
        &mut conditions,
        CONDITION_READY,
        ConditionStatus::False,
        "ValidationFailed",
        message,
    );

    let status_patch = serde_json::json!({
        "status": {
            "phase": Phase::Failed,
            "observedGeneration": platform.metadata.generation,
            "conditions": conditions,
            "message": message,
        }
    });

    api.patch_status(
        &platform.name_any(),
        &PatchParams::apply("obsplat-operator"),
        &Patch::Merge(&status_patch),
    )
    .await
    .map_err(Error::Kube)?;

    Ok(())
}

fn error_policy(platform: Arc<ObservabilityPlatform>, error: &Error, _ctx: Arc<ControllerState>) -> Action {
    error!("reconcile error for {}: {:?}", platform.name_any(), error);
    let retry_duration = if error.is_retriable() {
        Duration::from_secs(15)
    } else {
        Duration::from_secs(60)
    };
    Action::requeue(retry_duration)
}

//! Prometheus metrics for the obsplat operator.
//!
//! The `/metrics` endpoint (when built with `--features metrics`) exports:
//! - `obsplat_reconcile_duration_seconds` (histogram)
//! - `obsplat_reconcile_errors_total` (counter)
//! - `obsplat_component_ready_replicas` / `obsplat_component_desired_replicas` (gauges)
//! - `obsplat_backup_total` / `obsplat_backup_duration_seconds` / `obsplat_backup_size_bytes`
//! - `obsplat_restore_total` / `obsplat_restore_items_total`
//! - `obsplat_scaling_active` / `obsplat_cost_estimate_usd` / `obsplat_potential_savings_usd`
//! - `obsplat_deprecation_usage_total`

use std::sync::atomic::{AtomicI64, AtomicU64};

use once_cell::sync::Lazy;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ReconcileLabels {
    pub namespace: String,
    pub platform: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ErrorLabels {
    pub namespace: String,
    pub platform: String,
    pub kind: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ComponentLabels {
    pub namespace: String,
    pub platform: String,
    pub component: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct BackupLabels {
    pub namespace: String,
    pub platform: String,
    pub result: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RestoreLabels {
    pub namespace: String,
    pub platform: String,
    pub result: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ScalingLabels {
    pub namespace: String,
    pub platform: String,
    pub component: String,
    pub mode: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct DeprecationLabels {
    pub path: String,
}

pub static RECONCILE_DURATION_SECONDS: Lazy<Family<ReconcileLabels, Histogram>> = Lazy::new(|| {
    fn reconcile_histogram() -> Histogram {
        Histogram::new(exponential_buckets(0.01, 2.0, 16))
    }
    Family::new_with_constructor(reconcile_histogram)
});

pub static RECONCILE_ERRORS_TOTAL: Lazy<Family<ErrorLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

pub static COMPONENT_READY_REPLICAS: Lazy<Family<ComponentLabels, Gauge<i64, AtomicI64>>> =
    Lazy::new(Family::default);

pub static COMPONENT_DESIRED_REPLICAS: Lazy<Family<ComponentLabels, Gauge<i64, AtomicI64>>> =
    Lazy::new(Family::default);

pub static BACKUP_TOTAL: Lazy<Family<BackupLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

pub static BACKUP_DURATION_SECONDS: Lazy<Family<BackupLabels, Histogram>> = Lazy::new(|| {
    fn backup_histogram() -> Histogram {
        Histogram::new(exponential_buckets(1.0, 2.0, 16))
    }
    Family::new_with_constructor(backup_histogram)
});

pub static BACKUP_SIZE_BYTES: Lazy<Family<BackupLabels, Gauge<i64, AtomicI64>>> =
    Lazy::new(Family::default);

pub static RESTORE_TOTAL: Lazy<Family<RestoreLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

pub static RESTORE_ITEMS_TOTAL: Lazy<Family<RestoreLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

pub static SCALING_ACTIVE: Lazy<Family<ScalingLabels, Gauge<i64, AtomicI64>>> =
    Lazy::new(Family::default);

pub static COST_ESTIMATE_USD: Lazy<Family<ComponentLabels, Gauge<i64, AtomicI64>>> =
    Lazy::new(Family::default);

pub static POTENTIAL_SAVINGS_USD: Lazy<Family<ComponentLabels, Gauge<i64, AtomicI64>>> =
    Lazy::new(Family::default);

pub static DEPRECATION_USAGE_TOTAL: Lazy<Family<DeprecationLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

/// Registers every metric family into a fresh `Registry`, called once at
/// startup before the health/metrics server starts serving `/metrics`.
pub fn register(registry: &mut Registry) {
    registry.register(
        "obsplat_reconcile_duration_seconds",
        "Time spent in a single platform reconcile pass",
        RECONCILE_DURATION_SECONDS.clone(),
    );
    registry.register(
        "obsplat_reconcile_errors_total",
        "Reconcile errors by kind",
        RECONCILE_ERRORS_TOTAL.clone(),
    );
    registry.register(
        "obsplat_component_ready_replicas",
        "Ready replicas observed for a component",
        COMPONENT_READY_REPLICAS.clone(),
    );
    registry.register(
        "obsplat_component_desired_replicas",
        "Desired replicas configured for a component",
        COMPONENT_DESIRED_REPLICAS.clone(),
    );
    registry.register(
        "obsplat_backup_total",
        "Backup runs by result",
        BACKUP_TOTAL.clone(),
    );
    registry.register(
        "obsplat_backup_duration_seconds",
        "Backup run duration",
        BACKUP_DURATION_SECONDS.clone(),
    );
    registry.register(
        "obsplat_backup_size_bytes",
        "Size of the most recent backup archive",
        BACKUP_SIZE_BYTES.clone(),
    );
    registry.register(
        "obsplat_restore_total",
        "Restore runs by result",
        RESTORE_TOTAL.clone(),
    );
    registry.register(
        "obsplat_restore_items_total",
        "Resources restored",
        RESTORE_ITEMS_TOTAL.clone(),
    );
    registry.register(
        "obsplat_scaling_active",
        "Whether an autoscaling decision is currently in progress for a component",
        SCALING_ACTIVE.clone(),
    );
    registry.register(
        "obsplat_cost_estimate_usd",
        "Estimated monthly cost in USD for a component's current configuration",
        COST_ESTIMATE_USD.clone(),
    );
    registry.register(
        "obsplat_potential_savings_usd",
        "Estimated monthly savings in USD available from a cheaper configuration",
        POTENTIAL_SAVINGS_USD.clone(),
    );
    registry.register(
        "obsplat_deprecation_usage_total",
        "Uses of a deprecated field or value, by path",
        DEPRECATION_USAGE_TOTAL.clone(),
    );
}

//! obsplat-operator: Kubernetes operator for the Obsplat observability
//! platform (Prometheus, Grafana, Loki, Tempo).
//!
//! Exposes a reconciliation engine for the `ObservabilityPlatform` CRD, an
//! autoscaling controller, a backup/restore state machine, and an
//! admission webhook enforcing the CRD's deprecation/migration rules.

pub mod autoscaling;
pub mod backup;
pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod health;
pub mod leader;
pub mod telemetry;
pub mod webhook;

pub use crate::error::{Error, Result};

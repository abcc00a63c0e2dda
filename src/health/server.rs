//! Health and metrics HTTP server: `/healthz`, `/readyz`, `/metrics`.
//!
//! Runs alongside the reconciler and autoscaler on a plain HTTP listener —
//! this endpoint is for the kubelet and the cluster's own Prometheus, not
//! an admission path, so it carries no TLS.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, routing::get, Router};
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::controller::metrics;
use crate::error::{Error, Result};

struct HealthState {
    registry: RwLock<Registry>,
    ready: std::sync::atomic::AtomicBool,
}

#[derive(Clone)]
pub struct HealthServer {
    state: Arc<HealthState>,
}

impl HealthServer {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        metrics::register(&mut registry);
        Self {
            state: Arc::new(HealthState {
                registry: RwLock::new(registry),
                ready: std::sync::atomic::AtomicBool::new(false),
            }),
        }
    }

    /// Flips the readiness probe to ready, called once the reconciler has
    /// confirmed the CRD exists and the controller loop is running.
    pub fn mark_ready(&self) {
        self.state
            .ready
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub async fn start(self, addr: SocketAddr) -> Result<()> {
        let app = Router::new()
            .route("/healthz", get(healthz_handler))
            .route("/readyz", get(readyz_handler))
            .route("/metrics", get(metrics_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone());

        info!("starting health/metrics server on {addr}");
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind {addr}: {e}")))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| Error::Config(format!("health server error: {e}")))?;
        Ok(())
    }
}

impl Default for HealthServer {
    fn default() -> Self {
        Self::new()
    }
}

async fn healthz_handler() -> &'static str {
    "ok"
}

async fn readyz_handler(State(state): State<Arc<HealthState>>) -> (axum::http::StatusCode, &'static str) {
    if state.ready.load(std::sync::atomic::Ordering::SeqCst) {
        (axum::http::StatusCode::OK, "ready")
    } else {
        (axum::http::StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

async fn metrics_handler(State(state): State<Arc<HealthState>>) -> String {
    let registry = state.registry.read().await;
    let mut buffer = String::new();
    encode(&mut buffer, &registry).unwrap_or_default();
    buffer
}

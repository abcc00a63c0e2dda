//! Admission webhook HTTP server.
//!
//! Exposes `/validate` and `/mutate` for the `ObservabilityPlatform` CRD's
//! `ValidatingWebhookConfiguration`/`MutatingWebhookConfiguration`, plus
//! `/healthz` and `/readyz` for the kubelet probes. TLS is handled by
//! `axum-server`'s rustls acceptor using a cert/key pair the operator's
//! deployment mounts from a Secret (self-signed via `rcgen` in dev, or
//! cert-manager-issued in cluster).

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use tracing::{error, info, instrument};

use crate::crd::ObservabilityPlatform;
use crate::error::{Error, Result};

use super::mutation::apply_mutations;
use super::types::HealthResponse;
use super::validation::validate;

#[derive(Clone)]
pub enum TlsConfig {
    /// Cert/key mounted on disk, typically by cert-manager.
    Files { cert_path: PathBuf, key_path: PathBuf },
    /// In-memory PEM material, from the operator's own self-signed
    /// certificate generator.
    Pem { cert_pem: Vec<u8>, key_pem: Vec<u8> },
}

#[derive(Clone, Default)]
pub struct WebhookServer {
    tls_config: Option<TlsConfig>,
}

impl WebhookServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tls(mut self, cert_path: PathBuf, key_path: PathBuf) -> Self {
        self.tls_config = Some(TlsConfig::Files { cert_path, key_path });
        self
    }

    pub fn with_tls_pem(mut self, cert_pem: Vec<u8>, key_pem: Vec<u8>) -> Self {
        self.tls_config = Some(TlsConfig::Pem { cert_pem, key_pem });
        self
    }

    fn router(self) -> Router {
        Router::new()
            .route("/healthz", get(health_handler))
            .route("/readyz", get(health_handler))
            .route("/validate", post(validate_handler))
            .route("/mutate", post(mutate_handler))
            .with_state(self)
    }

    pub async fn start(self, addr: SocketAddr) -> Result<()> {
        let tls_config = self.tls_config.clone();
        let app = self.router();

        info!("starting admission webhook server on {addr}");

        if let Some(tls) = tls_config {
            let rustls_config = match tls {
                TlsConfig::Files { cert_path, key_path } => {
                    axum_server::tls_rustls::RustlsConfig::from_pem_file(&cert_path, &key_path)
                        .await
                        .map_err(|e| Error::Config(format!("failed to load webhook TLS cert: {e}")))?
                }
                TlsConfig::Pem { cert_pem, key_pem } => {
                    axum_server::tls_rustls::RustlsConfig::from_pem(cert_pem, key_pem)
                        .await
                        .map_err(|e| Error::Config(format!("failed to load self-signed webhook TLS cert: {e}")))?
                }
            };
            axum_server::bind_rustls(addr, rustls_config)
                .serve(app.into_make_service())
                .await
                .map_err(|e| Error::Config(format!("webhook server error: {e}")))?;
        } else {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|e| Error::Config(format!("failed to bind {addr}: {e}")))?;
            axum::serve(listener, app)
                .await
                .map_err(|e| Error::Config(format!("webhook server error: {e}")))?;
        }

        Ok(())
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse { status: "ok".to_string() })
}

#[instrument(skip(review))]
async fn validate_handler(
    State(_state): State<WebhookServer>,
    Json(review): Json<AdmissionReview<ObservabilityPlatform>>,
) -> impl IntoResponse {
    let req: AdmissionRequest<ObservabilityPlatform> = match review.try_into() {
        Ok(req) => req,
        Err(e) => {
            error!("failed to parse admission request: {e}");
            return (
                StatusCode::BAD_REQUEST,
                Json(AdmissionResponse::invalid(format!("invalid admission request: {e}")).into_review()),
            );
        }
    };

    let outcome = validate(&req);

    let mut response = if outcome.allowed {
        AdmissionResponse::from(&req)
    } else {
        AdmissionResponse::from(&req).deny(
            outcome
                .message
                .unwrap_or_else(|| "validation failed".to_string()),
        )
    };

    if !outcome.warnings.is_empty() {
        response.warnings = Some(outcome.warnings);
    }

    (StatusCode::OK, Json(response.into_review()))
}

#[instrument(skip(review))]
async fn mutate_handler(
    State(_state): State<WebhookServer>,
    Json(review): Json<AdmissionReview<serde_json::Value>>,
) -> impl IntoResponse {
    let req: AdmissionRequest<serde_json::Value> = match review.try_into() {
        Ok(req) => req,
        Err(e) => {
            error!("failed to parse admission request: {e}");
            return (
                StatusCode::BAD_REQUEST,
                Json(AdmissionResponse::invalid(format!("invalid admission request: {e}")).into_review()),
            );
        }
    };

    let Some(object) = &req.object else {
        return (StatusCode::OK, Json(AdmissionResponse::from(&req).into_review()));
    };

    match apply_mutations(object) {
        Ok(Some(patch)) => {
            let mut response = AdmissionResponse::from(&req);
            response.patch = serde_json::to_vec(&patch).ok();
            response.patch_type = response
                .patch
                .as_ref()
                .map(|_| kube::core::admission::PatchType::JSONPatch);
            info!("applied mutations to {}", req.name);
            (StatusCode::OK, Json(response.into_review()))
        }
        Ok(None) => (StatusCode::OK, Json(AdmissionResponse::from(&req).into_review())),
        Err(e) => {
            error!("failed to apply mutations: {e}");
            let response = AdmissionResponse::from(&req).deny(format!("mutation failed: {e}"));
            (StatusCode::OK, Json(response.into_review()))
        }
    }
}

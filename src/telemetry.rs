//! Tracing/logging initialization.
//!
//! Always installs a `tracing-subscriber` JSON/fmt layer driven by
//! `RUST_LOG`. If `OTEL_EXPORTER_OTLP_ENDPOINT` is set, also installs an
//! OTLP span exporter so reconcile/autoscale/backup spans show up in the
//! cluster's tracing backend alongside the component managers' own spans.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::runtime::Tokio;
use opentelemetry_sdk::trace::Config as TraceConfig;
use opentelemetry_sdk::Resource;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};

/// Installs the global tracing subscriber. Call once at process start,
/// before any other module logs.
pub fn init(service_name: &str, otlp_endpoint: Option<&str>) -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer().with_target(true).json();

    let registry = tracing_subscriber::registry().with(env_filter).with(fmt_layer);

    match otlp_endpoint {
        Some(endpoint) => {
            let exporter = opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint);

            let provider = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(exporter)
                .with_trace_config(
                    TraceConfig::default().with_resource(Resource::new(vec![
                        opentelemetry::KeyValue::new("service.name", service_name.to_string()),
                    ])),
                )
                .install_batch(Tokio)
                .map_err(|e| Error::Config(format!("failed to install OTLP exporter: {e}")))?;

            let tracer = provider.tracer(service_name.to_string());
            let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
            registry.with(otel_layer).init();
        }
        None => registry.init(),
    }

    Ok(())
}

/// Flushes any buffered spans. Call on graceful shutdown so the last batch
/// of reconcile traces isn't dropped.
pub fn shutdown() {
    opentelemetry::global::shutdown_tracer_provider();
}

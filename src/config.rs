//! Operator process configuration, parsed from CLI flags with environment
//! variable fallbacks (`clap`'s `env` feature) so the same binary works
//! unchanged whether it's launched from a Deployment's `env:` block or a
//! developer's shell.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[derive(Parser, Clone, Debug)]
#[command(name = "obsplat-operator", version, about = "Kubernetes operator for the Obsplat observability platform")]
pub struct OperatorConfig {
    #[command(flatten)]
    pub reconciler: ReconcilerConfig,

    #[command(flatten)]
    pub autoscaler: AutoscalerConfig,

    #[command(flatten)]
    pub backup: BackupConfig,

    #[command(flatten)]
    pub webhook: WebhookConfig,

    #[command(flatten)]
    pub leader_election: LeaderElectionConfig,

    /// OTLP gRPC endpoint for distributed tracing; tracing export is
    /// disabled when unset.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

#[derive(Parser, Clone, Debug)]
pub struct ReconcilerConfig {
    /// Address the health/readiness/metrics HTTP server listens on.
    #[arg(long, env = "HEALTH_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub health_bind_addr: SocketAddr,
}

#[derive(Parser, Clone, Debug)]
pub struct AutoscalerConfig {
    /// How often the autoscaling loop re-evaluates every platform.
    #[arg(long, env = "AUTOSCALER_INTERVAL_SECONDS", default_value = "30", value_parser = parse_seconds)]
    pub interval: Duration,

    #[arg(long, env = "AUTOSCALER_ENABLED", default_value = "true")]
    pub enabled: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct BackupConfig {
    #[arg(long, env = "BACKUP_CONTROLLER_ENABLED", default_value = "true")]
    pub enabled: bool,

    #[arg(long, env = "RESTORE_CONTROLLER_ENABLED", default_value = "true")]
    pub restore_enabled: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct WebhookConfig {
    #[arg(long, env = "WEBHOOK_ENABLED", default_value = "true")]
    pub enabled: bool,

    #[arg(long, env = "WEBHOOK_BIND_ADDR", default_value = "0.0.0.0:8443")]
    pub bind_addr: SocketAddr,

    /// Cert-manager-issued cert/key pair mounted on disk. When unset, the
    /// operator generates and serves an in-memory self-signed certificate.
    #[arg(long, env = "WEBHOOK_TLS_CERT")]
    pub tls_cert: Option<PathBuf>,

    #[arg(long, env = "WEBHOOK_TLS_KEY")]
    pub tls_key: Option<PathBuf>,

    /// In-cluster Service name the webhook is reached through; used to
    /// build the self-signed certificate's subject alt names.
    #[arg(long, env = "WEBHOOK_SERVICE_NAME", default_value = "obsplat-operator-webhook")]
    pub service_name: String,

    #[arg(long, env = "WEBHOOK_SERVICE_NAMESPACE", default_value = "obsplat-system")]
    pub service_namespace: String,
}

#[derive(Parser, Clone, Debug)]
pub struct LeaderElectionConfig {
    #[arg(long, env = "LEADER_ELECTION_ENABLED", default_value = "true")]
    pub enabled: bool,

    #[arg(long, env = "LEADER_ELECTION_NAMESPACE", default_value = "obsplat-system")]
    pub namespace: String,

    #[arg(long, env = "LEADER_ELECTION_LEASE_NAME", default_value = "obsplat-operator-leader")]
    pub lease_name: String,

    #[arg(long, env = "LEADER_ELECTION_LEASE_DURATION_SECONDS", default_value = "15", value_parser = parse_seconds)]
    pub lease_duration: Duration,

    #[arg(long, env = "LEADER_ELECTION_RENEW_SECONDS", default_value = "10", value_parser = parse_seconds)]
    pub renew_interval: Duration,
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    s.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| format!("invalid seconds value {s}: {e}"))
}

//! obsplat-operator entry point.
//!
//! Starts the reconciler, autoscaler, backup/restore controllers, the
//! admission webhook, and the health/metrics server, gated on winning
//! leader election so only one replica mutates the cluster at a time.

use std::sync::Arc;

use clap::Parser;
use obsplat_operator::config::OperatorConfig;
use obsplat_operator::leader::LeaderElector;
use obsplat_operator::{backup, controller, health, telemetry, webhook, Error};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = OperatorConfig::parse();

    telemetry::init("obsplat-operator", config.otlp_endpoint.as_deref())?;

    info!("starting obsplat-operator v{}", env!("CARGO_PKG_VERSION"));

    let client = kube::Client::try_default()
        .await
        .map_err(Error::Kube)?;
    info!("connected to Kubernetes cluster");

    let health_server = health::HealthServer::new();
    let health_addr = config.reconciler.health_bind_addr;
    tokio::spawn(async move {
        if let Err(e) = health_server.start(health_addr).await {
            error!("health server exited: {e:?}");
        }
    });

    if config.webhook.enabled {
        let mut webhook_server = webhook::WebhookServer::new();
        if let (Some(cert), Some(key)) = (&config.webhook.tls_cert, &config.webhook.tls_key) {
            webhook_server = webhook_server.with_tls(cert.clone(), key.clone());
        } else {
            let dns_names = webhook::certs::service_dns_names(
                &config.webhook.service_name,
                &config.webhook.service_namespace,
            );
            let (cert_pem, key_pem) = webhook::certs::generate_self_signed(dns_names)?;
            info!("no webhook TLS cert configured, serving a generated self-signed certificate");
            webhook_server = webhook_server.with_tls_pem(cert_pem, key_pem);
        }
        let webhook_addr = config.webhook.bind_addr;
        tokio::spawn(async move {
            if let Err(e) = webhook_server.start(webhook_addr).await {
                error!("webhook server exited: {e:?}");
            }
        });
    }

    if config.leader_election.enabled {
        let elector = LeaderElector::new(client.clone(), config.leader_election.clone());
        let elector_for_run = elector.clone();
        tokio::spawn(async move { elector_for_run.run().await });

        info!("waiting to acquire leadership");
        loop {
            if elector.is_leader() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        }
        info!("leadership acquired, starting control loops");
    }

    let controller_state = Arc::new(controller::ControllerState { client: client.clone() });

    let autoscaler_client = client.clone();
    let autoscaler_enabled = config.autoscaler.enabled;
    let autoscaler_interval = config.autoscaler.interval;
    let autoscaler_handle = tokio::spawn(async move {
        if autoscaler_enabled {
            let state = Arc::new(obsplat_operator::autoscaling::AutoscalerState::new(autoscaler_client));
            obsplat_operator::autoscaling::run_autoscaler(state, autoscaler_interval).await;
        }
    });

    let backup_client = client.clone();
    let backup_enabled = config.backup.enabled;
    let backup_handle = tokio::spawn(async move {
        if backup_enabled {
            backup::run_backup_controller(backup_client).await;
        }
    });

    let restore_client = client.clone();
    let restore_enabled = config.backup.restore_enabled;
    let restore_handle = tokio::spawn(async move {
        if restore_enabled {
            backup::run_restore_controller(restore_client).await;
        }
    });

    let reconciler_result = controller::run_controller(controller_state).await;

    autoscaler_handle.abort();
    backup_handle.abort();
    restore_handle.abort();
    telemetry::shutdown();

    reconciler_result
}

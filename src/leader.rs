//! Leader election via the `coordination.k8s.io/v1` `Lease` object, so
//! only one replica of a horizontally-scaled operator deployment runs the
//! reconcile/autoscale/backup loops at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::MicroTime;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use tracing::{info, warn};

use crate::config::LeaderElectionConfig;
use crate::error::{Error, Result};

const FIELD_MANAGER: &str = "obsplat-operator";

#[derive(Clone)]
pub struct LeaderElector {
    client: Client,
    config: LeaderElectionConfig,
    identity: String,
    is_leader: Arc<AtomicBool>,
}

impl LeaderElector {
    pub fn new(client: Client, config: LeaderElectionConfig) -> Self {
        let identity = std::env::var("POD_NAME").unwrap_or_else(|_| {
            hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "obsplat-operator".to_string())
        });

        Self {
            client,
            config,
            identity,
            is_leader: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_leader(&self) -> bool {
        self.is_leader.load(Ordering::SeqCst)
    }

    /// Runs the acquire/renew loop forever, flipping `is_leader` as
    /// leadership is gained or lost. Intended to be spawned as its own
    /// task alongside the reconciler/autoscaler/backup loops, which should
    /// each check `is_leader()` before doing cluster-mutating work.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.config.renew_interval);
        loop {
            interval.tick().await;
            match self.try_acquire_or_renew().await {
                Ok(acquired) => {
                    let was_leader = self.is_leader.swap(acquired, Ordering::SeqCst);
                    if acquired && !was_leader {
                        info!("{} acquired leadership", self.identity);
                    } else if !acquired && was_leader {
                        warn!("{} lost leadership", self.identity);
                    }
                }
                Err(e) => {
                    warn!("leader election renew failed: {e:?}");
                    self.is_leader.store(false, Ordering::SeqCst);
                }
            }
        }
    }

    async fn try_acquire_or_renew(&self) -> Result<bool> {
        let api: Api<Lease> = Api::namespaced(self.client.clone(), &self.config.namespace);
        let now = Utc::now();

        match api.get(&self.config.lease_name).await {
            Ok(lease) => {
                let spec = lease.spec.unwrap_or_default();
                let held_by_self = spec.holder_identity.as_deref() == Some(self.identity.as_str());
                let expired = spec
                    .renew_time
                    .as_ref()
                    .map(|t| {
                        let elapsed = now.signed_duration_since(t.0).to_std().unwrap_or(Duration::ZERO);
                        elapsed > Duration::from_secs(spec.lease_duration_seconds.unwrap_or(15) as u64)
                    })
                    .unwrap_or(true);

                if held_by_self || expired {
                    self.patch_lease(&api, spec.lease_transitions.unwrap_or(0) + i32::from(!held_by_self)).await?;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Err(kube::Error::Api(e)) if e.code == 404 => {
                self.create_lease(&api).await?;
                Ok(true)
            }
            Err(e) => Err(Error::Kube(e)),
        }
    }

    async fn patch_lease(&self, api: &Api<Lease>, transitions: i32) -> Result<()> {
        let now = MicroTime(Utc::now());
        let patch = serde_json::json!({
            "spec": {
                "holderIdentity": self.identity,
                "leaseDurationSeconds": self.config.lease_duration.as_secs() as i32,
                "renewTime": now,
                "leaseTransitions": transitions,
            }
        });
        api.patch(
            &self.config.lease_name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&patch),
        )
        .await
        .map_err(Error::Kube)?;
        Ok(())
    }

    async fn create_lease(&self, api: &Api<Lease>) -> Result<()> {
        let lease = Lease {
            metadata: kube::api::ObjectMeta {
                name: Some(self.config.lease_name.clone()),
                namespace: Some(self.config.namespace.clone()),
                ..Default::default()
            },
            spec: Some(LeaseSpec {
                holder_identity: Some(self.identity.clone()),
                lease_duration_seconds: Some(self.config.lease_duration.as_secs() as i32),
                renew_time: Some(MicroTime(Utc::now())),
                lease_transitions: Some(0),
                acquire_time: Some(MicroTime(Utc::now())),
                ..Default::default()
            }),
        };
        match api.create(&PostParams::default(), &lease).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 409 => Ok(()),
            Err(e) => Err(Error::Kube(e)),
        }
    }
}

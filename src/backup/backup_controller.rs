//! `PlatformBackup` reconciler: the backup run state machine.
//!
//! A `PlatformBackup` with no `schedule` runs exactly once; one with a
//! `schedule` re-arms itself after each completed run, computing the next
//! fire time with the same `cron` crate the scheduled restore/reconcile
//! loop would use.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::Utc;
use cron::Schedule;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::{Action, Controller};
use kube::{Client, ResourceExt};
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use serde_json::json;
use tracing::{error, instrument, warn};

use crate::controller::metrics;
use crate::crd::backup::{BackupPhase, HookPhase, PlatformBackup};
use crate::error::{Error, Result};

use super::archive;
use super::compression;
use super::encryption;
use super::hooks;
use super::provider::{build_provider, destination_prefix};
use super::state::ActiveRunTable;

const FIELD_MANAGER: &str = "obsplat-operator";

pub struct BackupControllerState {
    pub client: Client,
    pub active: ActiveRunTable,
}

impl BackupControllerState {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            active: ActiveRunTable::default(),
        }
    }
}

pub async fn run_backup_controller(client: Client) {
    let state = Arc::new(BackupControllerState::new(client.clone()));
    let backups: Api<PlatformBackup> = Api::all(client);

    Controller::new(backups, Default::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, state)
        .for_each(|res| async move {
            if let Err(e) = res {
                warn!("backup reconcile error: {e:?}");
            }
        })
        .await;
}

#[instrument(skip(backup, state), fields(backup = %backup.name_any()))]
async fn reconcile(backup: Arc<PlatformBackup>, state: Arc<BackupControllerState>) -> Result<Action> {
    let namespace = backup.namespace().unwrap_or_else(|| "default".to_string());
    let name = backup.name_any();

    if let Some(schedule_spec) = &backup.spec.schedule {
        if schedule_spec.suspend {
            return Ok(Action::requeue(Duration::from_secs(300)));
        }

        if let Some(delay) = next_due_delay(schedule_spec, backup.status.as_ref().and_then(|s| s.completed_at.as_deref()))? {
            return Ok(Action::requeue(delay));
        }
    } else if backup.status.as_ref().map(|s| s.phase).unwrap_or_default() != BackupPhase::Pending {
        // One-shot backups never re-run once they've left Pending.
        return Ok(Action::await_change());
    }

    if !state.active.try_claim(&namespace, &name) {
        return Ok(Action::requeue(Duration::from_secs(15)));
    }

    let start = Instant::now();
    let result = run_backup(&state.client, &backup, &namespace).await;
    state.active.release(&namespace, &name);

    let platform = backup.spec.platform_ref.clone();
    match result {
        Ok((object_key, size_bytes)) => {
            let labels = metrics::BackupLabels { namespace: namespace.clone(), platform, result: "success".to_string() };
            metrics::BACKUP_TOTAL.get_or_create(&labels).inc();
            metrics::BACKUP_DURATION_SECONDS.get_or_create(&labels).observe(start.elapsed().as_secs_f64());
            metrics::BACKUP_SIZE_BYTES.get_or_create(&labels).set(size_bytes as i64);

            update_status(&state.client, &namespace, &name, BackupPhase::Completed, Some(object_key), Some(size_bytes), None).await?;
            prune_old_backups(&state.client, &backup, &namespace).await.ok();
            Ok(Action::requeue(Duration::from_secs(60)))
        }
        Err(e) => {
            error!("backup {name} failed: {e:?}");
            let labels = metrics::BackupLabels { namespace: namespace.clone(), platform, result: "failure".to_string() };
            metrics::BACKUP_TOTAL.get_or_create(&labels).inc();
            metrics::BACKUP_DURATION_SECONDS.get_or_create(&labels).observe(start.elapsed().as_secs_f64());

            update_status(&state.client, &namespace, &name, BackupPhase::Failed, None, None, Some(e.to_string())).await?;
            Ok(Action::requeue(Duration::from_secs(120)))
        }
    }
}

/// Returns `None` if a run is due now, `Some(delay)` if the schedule's next
/// fire time is still in the future.
fn next_due_delay(schedule_spec: &crate::crd::backup::ScheduleSpec, last_completed: Option<&str>) -> Result<Option<Duration>> {
    let schedule = Schedule::from_str(&schedule_spec.cron)
        .map_err(|e| Error::Config(format!("invalid cron expression {}: {e}", schedule_spec.cron)))?;

    let now = Utc::now();
    let Some(last) = last_completed.and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok()) else {
        return Ok(None);
    };

    let Some(next_fire) = schedule.after(&last.with_timezone(&Utc)).next() else {
        return Ok(Some(Duration::from_secs(3600)));
    };

    if next_fire <= now {
        Ok(None)
    } else {
        Ok(Some((next_fire - now).to_std().unwrap_or(Duration::from_secs(60))))
    }
}

async fn run_backup(client: &Client, backup: &PlatformBackup, namespace: &str) -> Result<(String, u64)> {
    hooks::run_hooks(&backup.spec.hooks, HookPhase::PreBackup).await?;

    let captured_at = Utc::now().to_rfc3339();
    let manifest = archive::collect(client, namespace, &backup.spec.platform_ref, &captured_at).await?;

    let json_bytes = serde_json::to_vec(&manifest).map_err(Error::Serialization)?;
    let compressed = compression::compress(&json_bytes, backup.spec.options.compression)?;

    let payload = if backup.spec.options.encryption.enabled {
        let key_ref = backup
            .spec
            .options
            .encryption
            .key_secret_ref
            .as_ref()
            .ok_or_else(|| Error::Config("encryption enabled without keySecretRef".to_string()))?;
        let key_material = read_secret_key(client, namespace, key_ref, "key").await?;
        encryption::encrypt(&compressed, &key_material)?
    } else {
        compressed
    };

    let credentials = resolve_credentials(client, namespace, &backup.spec.destination).await?;
    let store = build_provider(&backup.spec.destination, &credentials)?;

    let object_key = format!(
        "{}{}-{}.obsplat-backup",
        destination_prefix(&backup.spec.destination),
        backup.spec.platform_ref,
        captured_at.replace(':', "-")
    );
    let size_bytes = payload.len() as u64;
    let path = ObjectPath::from(object_key.clone());
    store
        .put(&path, Bytes::from(payload).into())
        .await
        .map_err(|e| Error::Provider(format!("failed to upload backup archive: {e}")))?;

    hooks::run_hooks(&backup.spec.hooks, HookPhase::PostBackup).await?;

    Ok((object_key, size_bytes))
}

async fn resolve_credentials(
    client: &Client,
    namespace: &str,
    destination: &crate::crd::backup::BackupDestinationSpec,
) -> Result<std::collections::BTreeMap<String, String>> {
    use crate::crd::backup::BackupDestinationSpec::*;
    let secret_name = match destination {
        S3 { credentials_secret_ref, .. } => credentials_secret_ref,
        Gcs { credentials_secret_ref, .. } => credentials_secret_ref,
        Azure { credentials_secret_ref, .. } => credentials_secret_ref,
        Local { .. } => return Ok(Default::default()),
    };

    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = api.get(secret_name).await.map_err(Error::Kube)?;
    let mut map = std::collections::BTreeMap::new();
    if let Some(data) = secret.data {
        for (k, v) in data {
            map.insert(k, String::from_utf8_lossy(&v.0).to_string());
        }
    }
    Ok(map)
}

async fn read_secret_key(client: &Client, namespace: &str, secret_name: &str, key: &str) -> Result<Vec<u8>> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = api.get(secret_name).await.map_err(Error::Kube)?;
    secret
        .data
        .and_then(|mut d| d.remove(key))
        .map(|v| v.0)
        .ok_or_else(|| Error::Config(format!("secret {secret_name} missing key {key}")))
}

async fn update_status(
    client: &Client,
    namespace: &str,
    name: &str,
    phase: BackupPhase,
    object_key: Option<String>,
    size_bytes: Option<u64>,
    message: Option<String>,
) -> Result<()> {
    let api: Api<PlatformBackup> = Api::namespaced(client.clone(), namespace);
    let now = Utc::now().to_rfc3339();
    let patch = json!({
        "status": {
            "phase": phase,
            "completedAt": now,
            "objectKey": object_key,
            "sizeBytes": size_bytes,
            "message": message,
        }
    });
    api.patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
        .await
        .map_err(Error::Kube)?;
    Ok(())
}

/// Deletes backups beyond `retention.maxBackups`, oldest first, and any
/// older than `retention.maxAge`.
async fn prune_old_backups(client: &Client, backup: &PlatformBackup, namespace: &str) -> Result<()> {
    if !backup.spec.retention.prune_on_schedule {
        return Ok(());
    }

    let credentials = resolve_credentials(client, namespace, &backup.spec.destination).await?;
    let store = build_provider(&backup.spec.destination, &credentials)?;
    let prefix = ObjectPath::from(destination_prefix(&backup.spec.destination));

    let mut entries = Vec::new();
    let mut stream = store.list(Some(&prefix));
    use futures::StreamExt;
    while let Some(meta) = stream.next().await {
        match meta {
            Ok(m) => entries.push(m),
            Err(e) => {
                warn!("failed to list backup objects for pruning: {e}");
                return Ok(());
            }
        }
    }
    entries.sort_by_key(|m| m.last_modified);

    if let Some(max_age) = &backup.spec.retention.max_age {
        if let Some(cutoff) = parse_duration_ago(max_age) {
            for entry in entries.iter().filter(|e| e.last_modified < cutoff) {
                let _ = store.delete(&entry.location).await;
            }
        }
    }

    if let Some(max_backups) = backup.spec.retention.max_backups {
        let max_backups = max_backups as usize;
        if entries.len() > max_backups {
            let overflow = entries.len() - max_backups;
            for entry in entries.iter().take(overflow) {
                let _ = store.delete(&entry.location).await;
            }
        }
    }

    Ok(())
}

fn parse_duration_ago(spec: &str) -> Option<chrono::DateTime<Utc>> {
    let spec = spec.trim();
    let (value, unit) = spec.split_at(spec.len().saturating_sub(1));
    let value: i64 = value.parse().ok()?;
    let duration = match unit {
        "h" => chrono::Duration::hours(value),
        "d" => chrono::Duration::days(value),
        _ => return None,
    };
    Some(Utc::now() - duration)
}

fn error_policy(_backup: Arc<PlatformBackup>, error: &Error, _state: Arc<BackupControllerState>) -> Action {
    if error.is_retriable() {
        Action::requeue(Duration::from_secs(30))
    } else {
        Action::requeue(Duration::from_secs(120))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_duration() {
        let cutoff = parse_duration_ago("30d").unwrap();
        assert!(cutoff < Utc::now());
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(parse_duration_ago("30x").is_none());
    }
}

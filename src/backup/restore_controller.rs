//! `PlatformRestore` reconciler: download, decrypt, decompress, and replay
//! an archive back onto the cluster.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::{Action, Controller};
use kube::{Client, ResourceExt};
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use serde_json::json;
use tracing::{error, instrument, warn};

use crate::controller::metrics;
use crate::crd::backup::{BackupDestinationSpec, HookPhase, PlatformBackup};
use crate::crd::restore::{PlatformRestore, RestorePhase};
use crate::error::{Error, Result};

use super::archive::{self, ArchiveManifest};
use super::compression;
use super::encryption;
use super::hooks;
use super::provider::build_provider;
use super::state::ActiveRunTable;

const FIELD_MANAGER: &str = "obsplat-operator";

pub struct RestoreControllerState {
    pub client: Client,
    pub active: ActiveRunTable,
}

impl RestoreControllerState {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            active: ActiveRunTable::default(),
        }
    }
}

pub async fn run_restore_controller(client: Client) {
    let state = Arc::new(RestoreControllerState::new(client.clone()));
    let restores: Api<PlatformRestore> = Api::all(client);

    Controller::new(restores, Default::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, state)
        .for_each(|res| async move {
            if let Err(e) = res {
                warn!("restore reconcile error: {e:?}");
            }
        })
        .await;
}

#[instrument(skip(restore, state), fields(restore = %restore.name_any()))]
async fn reconcile(restore: Arc<PlatformRestore>, state: Arc<RestoreControllerState>) -> Result<Action> {
    let namespace = restore.namespace().unwrap_or_else(|| "default".to_string());
    let name = restore.name_any();

    let phase = restore.status.as_ref().map(|s| s.phase).unwrap_or_default();
    if phase == RestorePhase::Completed || phase == RestorePhase::Failed {
        return Ok(Action::await_change());
    }

    if !state.active.try_claim(&namespace, &name) {
        return Ok(Action::requeue(Duration::from_secs(15)));
    }

    let result = run_restore(&state.client, &restore, &namespace).await;
    state.active.release(&namespace, &name);
    let platform = restore.spec.target_platform.clone();

    match result {
        Ok((restored, skipped)) => {
            let labels = metrics::RestoreLabels { namespace: namespace.clone(), platform, result: "success".to_string() };
            metrics::RESTORE_TOTAL.get_or_create(&labels).inc();
            metrics::RESTORE_ITEMS_TOTAL.get_or_create(&labels).inc_by(restored as u64);

            update_status(&state.client, &namespace, &name, RestorePhase::Completed, restored, skipped, None).await?;
            Ok(Action::await_change())
        }
        Err(e) => {
            error!("restore {name} failed: {e:?}");
            let labels = metrics::RestoreLabels { namespace: namespace.clone(), platform, result: "failure".to_string() };
            metrics::RESTORE_TOTAL.get_or_create(&labels).inc();

            update_status(&state.client, &namespace, &name, RestorePhase::Failed, 0, 0, Some(e.to_string())).await?;
            Ok(Action::requeue(Duration::from_secs(60)))
        }
    }
}

async fn run_restore(client: &Client, restore: &PlatformRestore, namespace: &str) -> Result<(u32, u32)> {
    hooks::run_hooks(&restore.spec.hooks, HookPhase::PreRestore).await?;

    let destination = resolve_source(client, restore, namespace).await?;
    let credentials = resolve_credentials(client, namespace, &destination).await?;
    let store = build_provider(&destination, &credentials)?;

    let object_key = resolve_object_key(client, restore, namespace, &destination).await?;
    let path = ObjectPath::from(object_key.clone());
    let get_result = store
        .get(&path)
        .await
        .map_err(|e| Error::Provider(format!("failed to download archive {object_key}: {e}")))?;
    let bytes = get_result
        .bytes()
        .await
        .map_err(|e| Error::Provider(format!("failed to read archive body: {e}")))?;

    let decrypted = maybe_decrypt(client, restore, namespace, &bytes).await?;
    let decompressed = compression::decompress(&decrypted, crate::crd::backup::CompressionKind::Gzip)
        .or_else(|_| compression::decompress(&decrypted, crate::crd::backup::CompressionKind::None))?;

    let manifest: ArchiveManifest = serde_json::from_slice(&decompressed).map_err(Error::Serialization)?;

    if restore.spec.validate_before_restore {
        validate_manifest(&manifest)?;
    }

    let target_namespace = restore.spec.namespace_mapping.clone().unwrap_or_else(|| namespace.to_string());
    let (restored, skipped) = archive::restore(client, &manifest, &target_namespace, &restore.spec.resource_filters).await?;

    hooks::run_hooks(&restore.spec.hooks, HookPhase::PostRestore).await?;

    Ok((restored, skipped))
}

fn validate_manifest(manifest: &ArchiveManifest) -> Result<()> {
    if manifest.platform_name.is_empty() {
        return Err(Error::Validation("archive manifest missing platform name".to_string()));
    }
    if manifest.resources.is_empty() {
        warn!("archive manifest for {} contains no resources", manifest.platform_name);
    }
    Ok(())
}

/// Resolves the effective source destination: either the one named
/// directly in the restore spec, or the one recorded against the
/// `PlatformBackup` it references.
async fn resolve_source(client: &Client, restore: &PlatformRestore, namespace: &str) -> Result<BackupDestinationSpec> {
    if let Some(source) = &restore.spec.source {
        return Ok(source.clone());
    }

    let backup_name = restore
        .spec
        .source_backup
        .as_ref()
        .ok_or_else(|| Error::Validation("restore spec has neither source nor sourceBackup".to_string()))?;

    let api: Api<PlatformBackup> = Api::namespaced(client.clone(), namespace);
    let backup = api.get(backup_name).await.map_err(Error::Kube)?;
    Ok(backup.spec.destination)
}

async fn resolve_object_key(
    client: &Client,
    restore: &PlatformRestore,
    namespace: &str,
    _destination: &BackupDestinationSpec,
) -> Result<String> {
    let Some(backup_name) = &restore.spec.source_backup else {
        return Err(Error::Validation(
            "direct-source restores must set status.objectKey via an external tool; sourceBackup is required for automatic lookup".to_string(),
        ));
    };

    let api: Api<PlatformBackup> = Api::namespaced(client.clone(), namespace);
    let backup = api.get(backup_name).await.map_err(Error::Kube)?;
    backup
        .status
        .and_then(|s| s.object_key)
        .ok_or_else(|| Error::Validation(format!("backup {backup_name} has no recorded objectKey yet")))
}

async fn maybe_decrypt(client: &Client, restore: &PlatformRestore, namespace: &str, payload: &[u8]) -> Result<Vec<u8>> {
    let Some(backup_name) = &restore.spec.source_backup else {
        return Ok(payload.to_vec());
    };
    let api: Api<PlatformBackup> = Api::namespaced(client.clone(), namespace);
    let backup = api.get(backup_name).await.map_err(Error::Kube)?;

    if !backup.spec.options.encryption.enabled {
        return Ok(payload.to_vec());
    }

    let key_ref = backup
        .spec
        .options
        .encryption
        .key_secret_ref
        .as_ref()
        .ok_or_else(|| Error::Config("encryption enabled without keySecretRef".to_string()))?;
    let secret_api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = secret_api.get(key_ref).await.map_err(Error::Kube)?;
    let key_material = secret
        .data
        .and_then(|mut d| d.remove("key"))
        .map(|v| v.0)
        .ok_or_else(|| Error::Config(format!("secret {key_ref} missing key \"key\"")))?;

    encryption::decrypt(payload, &key_material)
}

async fn resolve_credentials(
    client: &Client,
    namespace: &str,
    destination: &BackupDestinationSpec,
) -> Result<std::collections::BTreeMap<String, String>> {
    use BackupDestinationSpec::*;
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

async fn update_status(
    client: &Client,
    namespace: &str,
    name: &str,
    phase: RestorePhase,
    items_restored: u32,
    items_skipped: u32,
    message: Option<String>,
) -> Result<()> {
    let api: Api<PlatformRestore> = Api::namespaced(client.clone(), namespace);
    let now = Utc::now().to_rfc3339();
    let patch = json!({
        "status": {
            "phase": phase,
            "completedAt": now,
            "itemsRestored": items_restored,
            "itemsSkipped": items_skipped,
            "message": message,
        }
    });
    api.patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
        .await
        .map_err(Error::Kube)?;
    Ok(())
}

fn error_policy(_restore: Arc<PlatformRestore>, error: &Error, _state: Arc<RestoreControllerState>) -> Action {
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
    fn validate_manifest_rejects_empty_platform_name() {
        let manifest = ArchiveManifest {
            platform_name: String::new(),
            namespace: "default".to_string(),
            captured_at: "2026-01-01T00:00:00Z".to_string(),
            platform: serde_json::json!({}),
            resources: vec![],
        };
        assert!(validate_manifest(&manifest).is_err());
    }

    #[test]
    fn validate_manifest_accepts_named_platform_with_no_resources() {
        let manifest = ArchiveManifest {
            platform_name: "demo".to_string(),
            namespace: "default".to_string(),
            captured_at: "2026-01-01T00:00:00Z".to_string(),
            platform: serde_json::json!({}),
            resources: vec![],
        };
        assert!(validate_manifest(&manifest).is_ok());
    }
}

//! Collects an `ObservabilityPlatform`'s Kubernetes resources into a
//! single serialized archive, and restores them back onto a cluster.

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Secret, Service};
use kube::api::{Api, ListParams, PostParams};
use kube::{Client, ResourceExt};
use serde::{Deserialize, Serialize};

use crate::crd::ObservabilityPlatform;
use crate::error::{Error, Result};

const LABEL_SELECTOR_KEY: &str = "app.kubernetes.io/instance";

/// A single captured Kubernetes object, kept as raw JSON so the archive
/// format doesn't need to track every resource type's Rust struct version.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchivedResource {
    pub kind: String,
    pub name: String,
    pub data: serde_json::Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchiveManifest {
    pub platform_name: String,
    pub namespace: String,
    pub captured_at: String,
    pub platform: serde_json::Value,
    pub resources: Vec<ArchivedResource>,
}

/// Gathers the platform object itself plus every workload/config/storage
/// resource labeled as belonging to it.
pub async fn collect(client: &Client, namespace: &str, platform_name: &str, captured_at: &str) -> Result<ArchiveManifest> {
    let platforms: Api<ObservabilityPlatform> = Api::namespaced(client.clone(), namespace);
    let platform = platforms.get(platform_name).await.map_err(Error::Kube)?;

    let selector = format!("{LABEL_SELECTOR_KEY}={platform_name}");
    let lp = ListParams::default().labels(&selector);

    let mut resources = Vec::new();

    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    for item in deployments.list(&lp).await.map_err(Error::Kube)?.items {
        resources.push(to_archived("Deployment", item)?);
    }

    let statefulsets: Api<StatefulSet> = Api::namespaced(client.clone(), namespace);
    for item in statefulsets.list(&lp).await.map_err(Error::Kube)?.items {
        resources.push(to_archived("StatefulSet", item)?);
    }

    let services: Api<Service> = Api::namespaced(client.clone(), namespace);
    for item in services.list(&lp).await.map_err(Error::Kube)?.items {
        resources.push(to_archived("Service", item)?);
    }

    let configmaps: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
    for item in configmaps.list(&lp).await.map_err(Error::Kube)?.items {
        resources.push(to_archived("ConfigMap", item)?);
    }

    let pvcs: Api<PersistentVolumeClaim> = Api::namespaced(client.clone(), namespace);
    for item in pvcs.list(&lp).await.map_err(Error::Kube)?.items {
        resources.push(to_archived("PersistentVolumeClaim", item)?);
    }

    // Secrets are captured last and only those explicitly labeled, since
    // most cluster-generated secrets (service account tokens, TLS
    // webhook certs) should never round-trip through a backup archive.
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    for item in secrets.list(&lp).await.map_err(Error::Kube)?.items {
        resources.push(to_archived("Secret", item)?);
    }

    Ok(ArchiveManifest {
        platform_name: platform_name.to_string(),
        namespace: namespace.to_string(),
        captured_at: captured_at.to_string(),
        platform: serde_json::to_value(&platform).map_err(Error::Serialization)?,
        resources,
    })
}

fn to_archived<T: serde::Serialize + ResourceExt>(kind: &str, object: T) -> Result<ArchivedResource> {
    let name = object.name_any();
    let data = serde_json::to_value(&object).map_err(Error::Serialization)?;
    Ok(ArchivedResource {
        kind: kind.to_string(),
        name,
        data,
    })
}

/// Restore order: namespaced config before workloads before services, so a
/// workload never starts referencing a ConfigMap/Secret that isn't there
/// yet.
const RESTORE_ORDER: &[&str] = &[
    "Secret",
    "ConfigMap",
    "PersistentVolumeClaim",
    "StatefulSet",
    "Deployment",
    "Service",
];

/// Applies every archived resource back onto the cluster in dependency
/// order, honoring `resource_filters` (an allow-list of kinds; empty means
/// all kinds) and remapping the namespace if `target_namespace` differs
/// from the one the archive was captured from.
pub async fn restore(
    client: &Client,
    manifest: &ArchiveManifest,
    target_namespace: &str,
    resource_filters: &[String],
) -> Result<(u32, u32)> {
    let mut restored = 0u32;
    let mut skipped = 0u32;

    for kind in RESTORE_ORDER {
        for resource in manifest.resources.iter().filter(|r| &r.kind == kind) {
            if !resource_filters.is_empty() && !resource_filters.iter().any(|f| f == kind) {
                skipped += 1;
                continue;
            }

            let mut data = resource.data.clone();
            strip_server_fields(&mut data);
            set_namespace(&mut data, target_namespace);

            match restore_one(client, kind, target_namespace, data).await {
                Ok(()) => restored += 1,
                Err(e) => {
                    tracing::warn!("failed to restore {kind}/{}: {e:?}", resource.name);
                    skipped += 1;
                }
            }
        }
    }

    Ok((restored, skipped))
}

fn strip_server_fields(data: &mut serde_json::Value) {
    if let Some(metadata) = data.get_mut("metadata").and_then(|m| m.as_object_mut()) {
        for key in [
            "resourceVersion",
            "uid",
            "creationTimestamp",
            "generation",
            "managedFields",
            "selfLink",
            "ownerReferences",
        ] {
            metadata.remove(key);
        }
    }
    if let Some(obj) = data.as_object_mut() {
        obj.remove("status");
    }
}

fn set_namespace(data: &mut serde_json::Value, namespace: &str) {
    if let Some(metadata) = data.get_mut("metadata").and_then(|m| m.as_object_mut()) {
        metadata.insert("namespace".to_string(), serde_json::Value::String(namespace.to_string()));
    }
}

async fn restore_one(client: &Client, kind: &str, namespace: &str, data: serde_json::Value) -> Result<()> {
    let pp = PostParams::default();
    match kind {
        "Deployment" => {
            let obj: Deployment = serde_json::from_value(data).map_err(Error::Serialization)?;
            let api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
            create_or_ignore(api.create(&pp, &obj).await)
        }
        "StatefulSet" => {
            let obj: StatefulSet = serde_json::from_value(data).map_err(Error::Serialization)?;
            let api: Api<StatefulSet> = Api::namespaced(client.clone(), namespace);
            create_or_ignore(api.create(&pp, &obj).await)
        }
        "Service" => {
            let obj: Service = serde_json::from_value(data).map_err(Error::Serialization)?;
            let api: Api<Service> = Api::namespaced(client.clone(), namespace);
            create_or_ignore(api.create(&pp, &obj).await)
        }
        "ConfigMap" => {
            let obj: ConfigMap = serde_json::from_value(data).map_err(Error::Serialization)?;
            let api: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
            create_or_ignore(api.create(&pp, &obj).await)
        }
        "Secret" => {
            let obj: Secret = serde_json::from_value(data).map_err(Error::Serialization)?;
            let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
            create_or_ignore(api.create(&pp, &obj).await)
        }
        "PersistentVolumeClaim" => {
            let obj: PersistentVolumeClaim = serde_json::from_value(data).map_err(Error::Serialization)?;
            let api: Api<PersistentVolumeClaim> = Api::namespaced(client.clone(), namespace);
            create_or_ignore(api.create(&pp, &obj).await)
        }
        other => Err(Error::Config(format!("unrestorable resource kind {other}"))),
    }
}

fn create_or_ignore<T>(result: kube::Result<T>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 409 => Ok(()),
        Err(e) => Err(Error::Kube(e)),
    }
}

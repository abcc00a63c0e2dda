//! `PlatformRestore` Custom Resource Definition.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::backup::{BackupDestinationSpec, HookSpec};
use super::types::Condition;

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "obsplat.io",
    version = "v1beta1",
    kind = "PlatformRestore",
    namespaced,
    status = "PlatformRestoreStatus",
    shortname = "oprestore",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Source","type":"string","jsonPath":".spec.sourceBackup"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PlatformRestoreSpec {
    /// Name of the `PlatformBackup` object that produced the archive, if
    /// restoring from one tracked in-cluster. Mutually exclusive with
    /// `source`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_backup: Option<String>,

    /// Direct reference to an archive location, for restoring a backup the
    /// cluster no longer has a `PlatformBackup` record for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<BackupDestinationSpec>,

    /// Platform name to restore into; created if absent.
    pub target_platform: String,

    #[serde(default)]
    pub namespace_mapping: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_filters: Vec<String>,

    #[serde(default = "default_true")]
    pub validate_before_restore: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<HookSpec>,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformRestoreStatus {
    #[serde(default)]
    pub phase: RestorePhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub items_restored: u32,
    #[serde(default)]
    pub items_skipped: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum RestorePhase {
    #[default]
    Pending,
    Validating,
    InProgress,
    Completed,
    Failed,
}

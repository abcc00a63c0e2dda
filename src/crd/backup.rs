//! `PlatformBackup` Custom Resource Definition.
//!
//! A `PlatformBackup` object describes a single backup run (or, with
//! `schedule` set, a recurring one) of an `ObservabilityPlatform`'s
//! Kubernetes resources and persistent state.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::Condition;

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "obsplat.io",
    version = "v1beta1",
    kind = "PlatformBackup",
    namespaced,
    status = "PlatformBackupStatus",
    shortname = "opbackup",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Platform","type":"string","jsonPath":".spec.platformRef"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PlatformBackupSpec {
    /// Name of the `ObservabilityPlatform` in the same namespace to back up.
    pub platform_ref: String,

    pub destination: BackupDestinationSpec,

    #[serde(default)]
    pub options: BackupOptionsSpec,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleSpec>,

    #[serde(default)]
    pub retention: RetentionSpec,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<HookSpec>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", tag = "provider")]
pub enum BackupDestinationSpec {
    S3 {
        bucket: String,
        region: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
        credentials_secret_ref: String,
        #[serde(default)]
        prefix: String,
    },
    Gcs {
        bucket: String,
        credentials_secret_ref: String,
        #[serde(default)]
        prefix: String,
    },
    Azure {
        container: String,
        account: String,
        credentials_secret_ref: String,
        #[serde(default)]
        prefix: String,
    },
    Local {
        path: String,
    },
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupOptionsSpec {
    #[serde(default)]
    pub compression: CompressionKind,
    #[serde(default)]
    pub encryption: EncryptionSpec,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

fn default_parallelism() -> u32 {
    4
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    None,
    #[default]
    Gzip,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_secret_ref: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSpec {
    /// Standard five-field cron expression, evaluated in `timezone`.
    pub cron: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub suspend: bool,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RetentionSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_backups: Option<u32>,
    /// Maximum age, expressed as a Go-style duration string (`"720h"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<String>,
    #[serde(default = "default_true")]
    pub prune_on_schedule: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HookSpec {
    pub name: String,
    pub phase: HookPhase,
    pub command: Vec<String>,
    #[serde(default = "default_hook_timeout")]
    pub timeout_seconds: u32,
    #[serde(default)]
    pub on_error: HookErrorPolicy,
}

fn default_hook_timeout() -> u32 {
    60
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum HookPhase {
    PreBackup,
    PostBackup,
    PreRestore,
    PostRestore,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum HookErrorPolicy {
    #[default]
    Fail,
    Continue,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformBackupStatus {
    #[serde(default)]
    pub phase: BackupPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_key: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum BackupPhase {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Deleting,
}

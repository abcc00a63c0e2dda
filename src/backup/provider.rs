//! Storage-provider resolution: builds an [`object_store::ObjectStore`]
//! for a backup destination, dispatching on which cloud (or local path)
//! the destination names.

use std::collections::BTreeMap;
use std::sync::Arc;

use object_store::ObjectStore;

use crate::crd::backup::BackupDestinationSpec;
use crate::error::Result;

use super::providers::{azure, gcs, local, s3};

pub fn build_provider(
    destination: &BackupDestinationSpec,
    credentials: &BTreeMap<String, String>,
) -> Result<Arc<dyn ObjectStore>> {
    match destination {
        BackupDestinationSpec::S3 { .. } => s3::build(destination, credentials),
        BackupDestinationSpec::Gcs { .. } => gcs::build(destination, credentials),
        BackupDestinationSpec::Azure { .. } => azure::build(destination, credentials),
        BackupDestinationSpec::Local { .. } => local::build(destination),
    }
}

/// The key prefix configured on the destination, joined with a
/// forward-slash separator for object keys.
pub fn destination_prefix(destination: &BackupDestinationSpec) -> String {
    match destination {
        BackupDestinationSpec::S3 { prefix, .. } => prefix.clone(),
        BackupDestinationSpec::Gcs { prefix, .. } => prefix.clone(),
        BackupDestinationSpec::Azure { prefix, .. } => prefix.clone(),
        BackupDestinationSpec::Local { .. } => String::new(),
    }
}

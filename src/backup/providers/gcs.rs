use std::collections::BTreeMap;
use std::sync::Arc;

use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::ObjectStore;

use crate::crd::backup::BackupDestinationSpec;
use crate::error::{Error, Result};

pub fn build(destination: &BackupDestinationSpec, credentials: &BTreeMap<String, String>) -> Result<Arc<dyn ObjectStore>> {
    let BackupDestinationSpec::Gcs { bucket, .. } = destination else {
        return Err(Error::Config("build::gcs called with a non-GCS destination".to_string()));
    };

    let service_account_key = credentials
        .get("serviceAccountKey")
        .ok_or_else(|| Error::Config("GCS credentials secret missing serviceAccountKey".to_string()))?;

    let store = GoogleCloudStorageBuilder::new()
        .with_bucket_name(bucket)
        .with_service_account_key(service_account_key)
        .build()
        .map_err(|e| Error::Provider(format!("failed to build GCS client: {e}")))?;

    Ok(Arc::new(store))
}

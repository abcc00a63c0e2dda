use std::collections::BTreeMap;
use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::ObjectStore;

use crate::crd::backup::BackupDestinationSpec;
use crate::error::{Error, Result};

pub fn build(destination: &BackupDestinationSpec, credentials: &BTreeMap<String, String>) -> Result<Arc<dyn ObjectStore>> {
    let BackupDestinationSpec::S3 { bucket, region, endpoint, .. } = destination else {
        return Err(Error::Config("build::s3 called with a non-S3 destination".to_string()));
    };

    let access_key = credentials
        .get("accessKeyId")
        .ok_or_else(|| Error::Config("S3 credentials secret missing accessKeyId".to_string()))?;
    let secret_key = credentials
        .get("secretAccessKey")
        .ok_or_else(|| Error::Config("S3 credentials secret missing secretAccessKey".to_string()))?;

    let mut builder = AmazonS3Builder::new()
        .with_bucket_name(bucket)
        .with_region(region)
        .with_access_key_id(access_key)
        .with_secret_access_key(secret_key);

    if let Some(endpoint) = endpoint {
        builder = builder.with_endpoint(endpoint).with_allow_http(true);
    }

    let store = builder
        .build()
        .map_err(|e| Error::Provider(format!("failed to build S3 client: {e}")))?;

    Ok(Arc::new(store))
}

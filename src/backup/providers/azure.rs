use std::collections::BTreeMap;
use std::sync::Arc;

use object_store::azure::MicrosoftAzureBuilder;
use object_store::ObjectStore;

use crate::crd::backup::BackupDestinationSpec;
use crate::error::{Error, Result};

pub fn build(destination: &BackupDestinationSpec, credentials: &BTreeMap<String, String>) -> Result<Arc<dyn ObjectStore>> {
    let BackupDestinationSpec::Azure { container, account, .. } = destination else {
        return Err(Error::Config("build::azure called with a non-Azure destination".to_string()));
    };

    let access_key = credentials
        .get("accountKey")
        .ok_or_else(|| Error::Config("Azure credentials secret missing accountKey".to_string()))?;

    let store = MicrosoftAzureBuilder::new()
        .with_container_name(container)
        .with_account(account)
        .with_access_key(access_key)
        .build()
        .map_err(|e| Error::Provider(format!("failed to build Azure client: {e}")))?;

    Ok(Arc::new(store))
}

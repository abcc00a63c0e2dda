use std::sync::Arc;

use object_store::local::LocalFileSystem;
use object_store::ObjectStore;

use crate::crd::backup::BackupDestinationSpec;
use crate::error::{Error, Result};

/// Local-filesystem provider, intended for single-node test clusters and
/// dev environments where the operator's volume is already persistent.
pub fn build(destination: &BackupDestinationSpec) -> Result<Arc<dyn ObjectStore>> {
    let BackupDestinationSpec::Local { path } = destination else {
        return Err(Error::Config("build::local called with a non-local destination".to_string()));
    };

    std::fs::create_dir_all(path).map_err(Error::Io)?;
    let store = LocalFileSystem::new_with_prefix(path)
        .map_err(|e| Error::Provider(format!("failed to open local backup path {path}: {e}")))?;

    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_missing_backup_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backups").to_string_lossy().to_string();
        let destination = BackupDestinationSpec::Local { path: path.clone() };

        let store = build(&destination).unwrap();
        store
            .put(&object_store::path::Path::from("probe"), bytes::Bytes::from_static(b"x").into())
            .await
            .unwrap();
        assert!(std::path::Path::new(&path).exists());
    }

    #[test]
    fn rejects_non_local_destination() {
        let destination = BackupDestinationSpec::S3 {
            bucket: "b".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            credentials_secret_ref: "creds".to_string(),
            prefix: String::new(),
        };
        assert!(build(&destination).is_err());
    }
}

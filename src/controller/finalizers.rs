//! Finalizer handling for `ObservabilityPlatform` cleanup.
//!
//! Ensures that before Kubernetes finishes deleting a platform, its owned
//! component resources and backup/restore bookkeeping are cleaned up.

use kube::ResourceExt;

use crate::crd::ObservabilityPlatform;

pub const PLATFORM_FINALIZER: &str = "observabilityplatform.obsplat.io/finalizer";

pub fn is_being_deleted(platform: &ObservabilityPlatform) -> bool {
    platform.metadata.deletion_timestamp.is_some()
}

pub fn has_finalizer(platform: &ObservabilityPlatform) -> bool {
    platform
        .finalizers()
        .iter()
        .any(|f| f == PLATFORM_FINALIZER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalizer_name_is_domain_qualified() {
        assert_eq!(
            PLATFORM_FINALIZER,
            "observabilityplatform.obsplat.io/finalizer"
        );
    }
}

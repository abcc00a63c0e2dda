//! Custom resource definitions and the shared types they're built from.

pub mod backup;
pub mod conversion;
pub mod deprecation;
pub mod platform;
pub mod platform_v1alpha1;
pub mod restore;
pub mod types;

pub use backup::{PlatformBackup, PlatformBackupSpec, PlatformBackupStatus};
pub use platform::{ObservabilityPlatform, ObservabilityPlatformSpec, ObservabilityPlatformStatus};
pub use platform_v1alpha1::ObservabilityPlatformSpecV1alpha1;
pub use restore::{PlatformRestore, PlatformRestoreSpec, PlatformRestoreStatus};

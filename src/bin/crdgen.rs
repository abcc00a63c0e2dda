//! Prints the CRD manifests for every API version this operator serves,
//! concatenated as a multi-document YAML stream suitable for
//! `kubectl apply -f -`.

use kube::CustomResourceExt;
use obsplat_operator::crd::platform_v1alpha1::ObservabilityPlatform as ObservabilityPlatformV1alpha1;
use obsplat_operator::crd::{ObservabilityPlatform, PlatformBackup, PlatformRestore};

fn main() {
    let crds = [
        serde_yaml::to_string(&ObservabilityPlatform::crd()).unwrap(),
        serde_yaml::to_string(&ObservabilityPlatformV1alpha1::crd()).unwrap(),
        serde_yaml::to_string(&PlatformBackup::crd()).unwrap(),
        serde_yaml::to_string(&PlatformRestore::crd()).unwrap(),
    ];
    print!("{}", crds.join("---\n"));
}

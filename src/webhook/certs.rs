//! Self-signed TLS material for the admission webhook server.
//!
//! Used when no cert-manager-issued cert/key pair is configured: generates
//! an in-memory leaf certificate covering the webhook Service's in-cluster
//! DNS names so the operator can serve `/validate`/`/mutate` over TLS
//! without any external dependency. Not persisted — regenerated on every
//! process start, which is fine since the `ValidatingWebhookConfiguration`/
//! `MutatingWebhookConfiguration` objects are expected to carry `caBundle:
//! ""` with `service.port` trust disabled, or to be reconciled by whatever
//! installs them alongside a freshly generated bundle.

use rcgen::generate_simple_self_signed;

use crate::error::{Error, Result};

/// Builds the set of in-cluster DNS names a webhook Service is reachable
/// under, so the leaf certificate validates for all of them.
pub fn service_dns_names(service_name: &str, namespace: &str) -> Vec<String> {
    vec![
        service_name.to_string(),
        format!("{service_name}.{namespace}"),
        format!("{service_name}.{namespace}.svc"),
        format!("{service_name}.{namespace}.svc.cluster.local"),
    ]
}

/// Returns `(cert_pem, key_pem)` for a freshly generated self-signed
/// certificate valid for `dns_names`.
pub fn generate_self_signed(dns_names: Vec<String>) -> Result<(Vec<u8>, Vec<u8>)> {
    let certified_key = generate_simple_self_signed(dns_names)
        .map_err(|e| Error::Config(format!("failed to generate self-signed webhook cert: {e}")))?;
    let cert_pem = certified_key.cert.pem().into_bytes();
    let key_pem = certified_key.signing_key.serialize_pem().into_bytes();
    Ok((cert_pem, key_pem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_cert_and_key_pem() {
        let names = service_dns_names("obsplat-operator-webhook", "obsplat-system");
        let (cert, key) = generate_self_signed(names).unwrap();
        assert!(String::from_utf8_lossy(&cert).contains("BEGIN CERTIFICATE"));
        assert!(String::from_utf8_lossy(&key).contains("PRIVATE KEY"));
    }

    #[test]
    fn dns_names_cover_all_service_forms() {
        let names = service_dns_names("svc", "ns");
        assert_eq!(names.len(), 4);
        assert!(names.iter().any(|n| n == "svc.ns.svc.cluster.local"));
    }
}

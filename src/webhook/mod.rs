//! Admission webhook: validates `ObservabilityPlatform` specs and
//! auto-migrates deprecated field shapes on write.

pub mod certs;
pub mod mutation;
pub mod server;
pub mod types;
pub mod validation;

pub use mutation::apply_mutations;
pub use server::{TlsConfig, WebhookServer};

//! Health/readiness/metrics HTTP endpoints.

pub mod server;

pub use server::HealthServer;

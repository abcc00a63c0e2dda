//! Reconciliation engine: control loop, condition/finalizer helpers,
//! per-component managers, and the metrics registry they feed.

pub mod conditions;
pub mod finalizers;
pub mod managers;
pub mod metrics;
pub mod reconciler;
pub mod resources;

pub use reconciler::{run_controller, ControllerState};

//! Autoscaling subsystem: horizontal, vertical, predictive, and cost-aware
//! scaling decisions, plus the control loop that applies them.

pub mod controller;
pub mod cost;
pub mod drain;
pub mod events;
pub mod horizontal;
pub mod policy;
pub mod predictive;
pub mod vertical;

pub use controller::{run_autoscaler, AutoscalerState};

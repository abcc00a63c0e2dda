//! Selects the component manager implementation for a given component.
//!
//! All four components currently resolve to their native-primitive
//! manager. The factory exists as the seam a packaged-chart backed manager
//! would plug into (selected via an annotation or future spec field) with
//! runtime fallback to native on chart-apply failure, without touching call
//! sites in the reconciler.

use crate::crd::types::ComponentName;

use super::grafana::GrafanaManager;
use super::loki::LokiManager;
use super::prometheus::PrometheusManager;
use super::tempo::TempoManager;
use super::ComponentManager;

pub fn build_manager(component: ComponentName) -> Box<dyn ComponentManager> {
    match component {
        ComponentName::Prometheus => Box::new(PrometheusManager::new()),
        ComponentName::Grafana => Box::new(GrafanaManager::new()),
        ComponentName::Loki => Box::new(LokiManager::new()),
        ComponentName::Tempo => Box::new(TempoManager::new()),
    }
}

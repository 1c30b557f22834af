//! Application state

use bits_core::EndpointDirectory;
use std::sync::Arc;

/// Handle used to render Prometheus metrics
pub type MetricsHandle = metrics_exporter_prometheus::PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<EndpointDirectory>,
}

impl AppState {
    pub fn new(directory: Arc<EndpointDirectory>) -> Self {
        Self { directory }
    }
}

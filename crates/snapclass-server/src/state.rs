use crate::config::ServerConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use snapclass_classifiers::InferenceService;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,

    /// The single shared inference service
    pub service: Arc<InferenceService>,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,

    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        service: Arc<InferenceService>,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        Self {
            config: Arc::new(config),
            service,
            metrics_handle,
            started_at: Instant::now(),
        }
    }
}

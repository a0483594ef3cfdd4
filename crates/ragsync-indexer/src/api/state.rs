use std::time::Instant;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::ingest::LocalIngestion;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ingestion: LocalIngestion,
    pub metrics: Option<PrometheusHandle>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(ingestion: LocalIngestion) -> Self {
        Self { ingestion, metrics: None, started_at: Instant::now() }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

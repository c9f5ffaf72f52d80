//! Prometheus export and the domain counters recorded by the synchronizers.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Later calls are no-ops, so tests that
/// build several applications in one process can each call it.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!("Prometheus recorder not installed: {}", e),
    }
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_sync_run(kind: &'static str) {
    counter!("fleet_sync_runs_total", "kind" => kind).increment(1);
}

pub fn record_sync_failure(kind: &'static str) {
    counter!("fleet_sync_failures_total", "kind" => kind).increment(1);
}

pub fn record_sync_conflict() {
    counter!("fleet_sync_conflicts_total").increment(1);
}

pub fn record_ticket_reopened() {
    counter!("fleet_ticket_reopened_total").increment(1);
}

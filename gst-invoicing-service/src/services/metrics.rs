//! Prometheus metrics for gst-invoicing-service.
//!
//! Domain metrics live in the default `prometheus` registry. HTTP request
//! metrics are recorded by the shared middleware through the `metrics` facade
//! and rendered by the installed Prometheus recorder; `/metrics` serves both.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

static RECORDER_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Invoice counter by initial status.
pub static INVOICES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gst_invoicing_invoices_total",
        "Total number of invoices created by initial status",
        &["status"]
    )
    .expect("Failed to register invoices_total")
});

/// Status transitions performed by the lifecycle manager.
pub static STATUS_TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gst_invoicing_status_transitions_total",
        "Total number of invoice status transitions by target status and trigger",
        &["status", "trigger"] // trigger: mark_paid, sweep
    )
    .expect("Failed to register status_transitions_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gst_invoicing_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Store operation duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "gst_invoicing_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Report generation duration histogram.
pub static REPORT_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "gst_invoicing_report_duration_seconds",
        "Report generation duration in seconds",
        &["report"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register report_duration")
});

/// Initialize all metrics and the HTTP metrics recorder.
///
/// Safe to call more than once; only the first call installs the recorder.
pub fn init_metrics() {
    Lazy::force(&INVOICES_TOTAL);
    Lazy::force(&STATUS_TRANSITIONS_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&REPORT_DURATION);

    RECORDER_HANDLE.get_or_init(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder not installed, HTTP metrics disabled");
            None
        }
    });
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut body = encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default();

    if let Some(Some(handle)) = RECORDER_HANDLE.get() {
        body.push_str(&handle.render());
    }

    body
}

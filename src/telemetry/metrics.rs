//! Prometheus metrics setup and metric definitions

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Histogram buckets (seconds) for HTTP latency
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .set_buckets(LATENCY_BUCKETS)
        .context("failed to set histogram buckets")?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Register metric descriptions so HELP/TYPE lines appear from startup.
pub fn describe_metrics() {
    // HTTP
    describe_counter!("bct_http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "bct_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        "bct_http_requests_in_flight",
        "Number of HTTP requests currently being processed"
    );

    // Identity provider
    describe_counter!(
        "bct_keycloak_requests_total",
        "Keycloak Admin API calls by operation and outcome"
    );

    // Auth
    describe_counter!(
        "bct_auth_token_validation_total",
        "Bearer token validations by outcome"
    );
}

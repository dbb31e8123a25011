/// Metrics and telemetry for the DevHarbor backend
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Signin attempts and their outcomes
/// - Token issuance and authorization rejections
/// - Background job execution

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    /// Active HTTP requests
    pub static ref HTTP_REQUESTS_ACTIVE: IntGauge = register_int_gauge!(
        "http_requests_active",
        "Number of HTTP requests currently being processed"
    )
    .unwrap();

    // ========== Auth Metrics ==========

    /// Signin attempts by flow and outcome
    pub static ref SIGNINS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "signins_total",
        "Total number of signin attempts",
        &["flow", "outcome"]
    )
    .unwrap();

    /// Session tokens issued
    pub static ref TOKENS_ISSUED_TOTAL: IntCounter = register_int_counter!(
        "tokens_issued_total",
        "Total number of session tokens issued"
    )
    .unwrap();

    /// Bearer tokens turned away at the authorization gate
    pub static ref AUTH_REJECTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "auth_rejections_total",
        "Total number of rejected bearer tokens",
        &["reason"]
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();

    /// Background job duration in seconds
    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "background_job_duration_seconds",
        "Background job execution time in seconds",
        &["job_type"],
        vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record a signin attempt. Flow is "primary" or "dedicated"; outcome is
/// "success", "suspended", or "rejected".
pub fn record_signin(flow: &str, outcome: &str) {
    SIGNINS_TOTAL.with_label_values(&[flow, outcome]).inc();
}

/// Record a token issuance
pub fn record_token_issued() {
    TOKENS_ISSUED_TOTAL.inc();
}

/// Record a bearer token rejection at the authorization gate
pub fn record_auth_rejection(reason: &str) {
    AUTH_REJECTIONS_TOTAL.with_label_values(&[reason]).inc();
}

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str, duration: f64) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_type])
        .observe(duration);
}

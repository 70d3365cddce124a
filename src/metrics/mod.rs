//! Metrics module
//!
//! Prometheus counters and histograms for the upload pipeline.

pub mod server;

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, register_histogram_vec, Counter,
    CounterVec, Histogram, HistogramVec,
};

lazy_static! {
    // Upload metrics
    pub static ref UPLOADS_TOTAL: CounterVec = register_counter_vec!(
        "tubely_uploads_total",
        "Total number of uploads",
        &["kind", "status"]
    ).unwrap();

    pub static ref UPLOAD_BYTES_TOTAL: CounterVec = register_counter_vec!(
        "tubely_upload_bytes_total",
        "Total bytes stored",
        &["kind"]
    ).unwrap();

    pub static ref UPLOAD_DURATION: HistogramVec = register_histogram_vec!(
        "tubely_upload_duration_seconds",
        "Upload duration in seconds",
        &["kind", "strategy"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    ).unwrap();

    // Probe metrics
    pub static ref PROBE_DURATION: Histogram = register_histogram!(
        "tubely_probe_duration_seconds",
        "ffprobe run time in seconds",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    ).unwrap();

    pub static ref ASPECT_CLASSIFICATIONS: CounterVec = register_counter_vec!(
        "tubely_aspect_classifications_total",
        "Videos stored per aspect-ratio folder",
        &["folder"]
    ).unwrap();

    // Auth metrics
    pub static ref AUTH_ATTEMPTS: CounterVec = register_counter_vec!(
        "tubely_auth_attempts_total",
        "Authentication attempts",
        &["status"]
    ).unwrap();

    // Error metrics
    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "tubely_errors_total",
        "Total errors",
        &["type"]
    ).unwrap();

    pub static ref RECORD_UPDATES: Counter = register_counter!(
        "tubely_record_updates_total",
        "Video record URL updates committed"
    ).unwrap();
}

/// Record a successful upload
pub fn record_upload_success(kind: &str, bytes: u64) {
    UPLOADS_TOTAL.with_label_values(&[kind, "success"]).inc();
    UPLOAD_BYTES_TOTAL
        .with_label_values(&[kind])
        .inc_by(bytes as f64);
}

/// Record a failed upload
pub fn record_upload_failure(kind: &str) {
    UPLOADS_TOTAL.with_label_values(&[kind, "failure"]).inc();
}

/// Record upload duration
pub fn record_upload_duration(kind: &str, strategy: &str, duration_secs: f64) {
    UPLOAD_DURATION
        .with_label_values(&[kind, strategy])
        .observe(duration_secs);
}

/// Record one ffprobe run
pub fn record_probe_duration(duration_secs: f64) {
    PROBE_DURATION.observe(duration_secs);
}

/// Record the folder a video was classified into
pub fn record_aspect_classification(folder: &str) {
    ASPECT_CLASSIFICATIONS.with_label_values(&[folder]).inc();
}

/// Record authentication attempt
pub fn record_auth_attempt(success: bool) {
    let status = if success { "success" } else { "failure" };
    AUTH_ATTEMPTS.with_label_values(&[status]).inc();
}

/// Record an error
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Record a committed record update
pub fn record_record_update() {
    RECORD_UPDATES.inc();
}

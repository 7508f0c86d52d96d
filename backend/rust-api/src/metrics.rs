use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter_vec, register_int_gauge,
    CounterVec, Encoder, HistogramVec, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Identity lookup cache
    pub static ref CACHE_HIT_RATIO: CounterVec = register_counter_vec!(
        "identity_cache_hit_ratio",
        "Identity lookup cache hit/miss ratio",
        &["result"]
    )
    .unwrap();

    pub static ref IDENTITY_LOOKUPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "identity_lookups_total",
        "GitLab user lookups by outcome",
        &["outcome"]
    )
    .unwrap();

    // Quiz Metrics
    pub static ref QUIZ_SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_sessions_total",
        "Quiz session lifecycle events",
        &["event"]
    )
    .unwrap();

    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "quiz_sessions_active",
        "Number of quiz sessions held in memory"
    )
    .unwrap();

    pub static ref ANSWERS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_answers_submitted_total",
        "Total number of recorded answers",
        &["correct"]
    )
    .unwrap();

    pub static ref ATTEMPTS_RECORDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_attempts_recorded_total",
        "Completed attempts appended to history, or suppressed as repeats",
        &["outcome"]
    )
    .unwrap();

    pub static ref STATE_RESETS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_state_resets_total",
        "Sessions forced back to a safe state after an inconsistency",
        &["from_state"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

pub fn record_cache_hit() {
    CACHE_HIT_RATIO.with_label_values(&["hit"]).inc();
}

pub fn record_cache_miss() {
    CACHE_HIT_RATIO.with_label_values(&["miss"]).inc();
}

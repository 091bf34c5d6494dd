use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

use crate::mood::MoodOutcome;

/// Metric name prefix for all Aurafy metrics
const PREFIX: &str = "aurafy";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Upstream API Metrics
    pub static ref UPSTREAM_CALLS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_upstream_calls_total"), "Calls to the music API by endpoint and status"),
        &["endpoint", "status"]
    ).expect("Failed to create upstream_calls_total metric");

    pub static ref RATE_LIMIT_HITS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_rate_limit_hits_total"), "Upstream rate limit responses"),
        &["endpoint"]
    ).expect("Failed to create rate_limit_hits_total metric");

    pub static ref FEATURE_BATCHES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_feature_batches_total"), "Audio feature batches by outcome"),
        &["outcome"]
    ).expect("Failed to create feature_batches_total metric");

    // Analysis Metrics
    pub static ref AURA_OUTCOMES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_aura_outcomes_total"), "Classification results by outcome and rule"),
        &["outcome", "rule"]
    ).expect("Failed to create aura_outcomes_total metric");

    // OAuth Metrics
    pub static ref OAUTH_EXCHANGES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_oauth_exchanges_total"), "Token endpoint requests by grant and status"),
        &["grant", "status"]
    ).expect("Failed to create oauth_exchanges_total metric");

    pub static ref OAUTH_PENDING_STATES: Gauge = Gauge::new(
        format!("{PREFIX}_oauth_pending_states"),
        "Authorization flows waiting for their callback"
    ).expect("Failed to create oauth_pending_states metric");

    // Process Metrics
    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(UPSTREAM_CALLS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RATE_LIMIT_HITS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(FEATURE_BATCHES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(AURA_OUTCOMES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(OAUTH_EXCHANGES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(OAUTH_PENDING_STATES.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Label for API paths that match no route.
pub const UNMATCHED_ENDPOINT: &str = "unmatched";

/// Collapse a request path into a bounded label value.
///
/// Known route shapes keep their template with `{id}` in place of the
/// identifier. Unknown `/api` paths become [`UNMATCHED_ENDPOINT`] and
/// anything else is `static`.
pub fn categorize_endpoint(path: &str) -> String {
    if path == "/" {
        return "/".to_string();
    }
    let Some(rest) = path.strip_prefix("/api/") else {
        return "static".to_string();
    };

    let segments: Vec<&str> = rest.split('/').collect();
    let template = match segments.as_slice() {
        ["login"] => "/api/login",
        ["callback"] => "/api/callback",
        ["refresh_token"] => "/api/refresh_token",
        ["me"] => "/api/me",
        ["playlists"] => "/api/playlists",
        ["recently-played"] => "/api/recently-played",
        ["playlist", _] => "/api/playlist/{id}",
        ["analyze", "playlist", _] => "/api/analyze/playlist/{id}",
        ["analyze", "recent"] => "/api/analyze/recent",
        ["audio_features"] => "/api/audio_features",
        ["calculate_aura"] => "/api/calculate_aura",
        ["debug", "test-token"] => "/api/debug/test-token",
        ["debug", "test-playlist", _] => "/api/debug/test-playlist/{id}",
        ["debug", "test-recent"] => "/api/debug/test-recent",
        _ => UNMATCHED_ENDPOINT,
    };
    template.to_string()
}

/// Record an HTTP request under an already bounded endpoint label
pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, endpoint])
        .observe(duration.as_secs_f64());
}

/// Record a response from the music API
pub fn record_upstream_call(endpoint: &str, status: u16) {
    UPSTREAM_CALLS_TOTAL
        .with_label_values(&[endpoint, &status.to_string()])
        .inc();
}

/// Record a rate limit hit
pub fn record_rate_limit_hit(endpoint: &str) {
    RATE_LIMIT_HITS_TOTAL.with_label_values(&[endpoint]).inc();
}

pub fn record_feature_batch(outcome: &str) {
    FEATURE_BATCHES_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a classification result
pub fn record_aura_outcome(outcome: &MoodOutcome) {
    let rule = outcome
        .rule()
        .map(|r| format!("{:?}", r))
        .unwrap_or_else(|| "none".to_string());
    let kind = match outcome {
        MoodOutcome::Matched { .. } => "matched",
        MoodOutcome::NoMatch { .. } => "no_match",
        MoodOutcome::NoData => "no_data",
    };
    AURA_OUTCOMES_TOTAL.with_label_values(&[kind, &rule]).inc();
}

/// Record a token endpoint request
pub fn record_oauth_exchange(grant: &str, status: &str) {
    OAUTH_EXCHANGES_TOTAL
        .with_label_values(&[grant, status])
        .inc();
}

pub fn set_pending_auth_states(count: usize) {
    OAUTH_PENDING_STATES.set(count as f64);
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    // Parse the RSS (Resident Set Size) in kB
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        if let Ok(kb) = kb_str.parse::<f64>() {
                            PROCESS_MEMORY_BYTES.set(kb * 1024.0);
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all gateway metrics
const PREFIX: &str = "mistmcp";

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
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Tool Metrics
    pub static ref TOOL_CALLS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_tool_calls_total"), "Total tool calls by outcome"),
        &["tool", "outcome"]
    ).expect("Failed to create tool_calls_total metric");

    pub static ref TOOL_CALL_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_tool_call_duration_seconds"),
            "Tool execution duration in seconds"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["tool"]
    ).expect("Failed to create tool_call_duration_seconds metric");

    // Session Metrics
    pub static ref ACTIVE_SESSIONS: Gauge = Gauge::new(
        format!("{PREFIX}_active_sessions"),
        "Number of live MCP sessions"
    ).expect("Failed to create active_sessions metric");

    pub static ref SESSIONS_EVICTED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_sessions_evicted_total"),
        "Total sessions evicted for inactivity"
    ).expect("Failed to create sessions_evicted_total metric");

    pub static ref CATEGORIES_ENABLED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_categories_enabled_total"), "Tool categories enabled by sessions"),
        &["category"]
    ).expect("Failed to create categories_enabled_total metric");

    // Consent Metrics
    pub static ref CONSENT_DECISIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_consent_decisions_total"), "Consent exchanges by outcome"),
        &["outcome"]
    ).expect("Failed to create consent_decisions_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(TOOL_CALLS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(TOOL_CALL_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(ACTIVE_SESSIONS.clone()));
    let _ = REGISTRY.register(Box::new(SESSIONS_EVICTED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CATEGORIES_ENABLED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CONSENT_DECISIONS_TOTAL.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a tool call. `duration` is only observed for calls that ran.
pub fn record_tool_call(tool: &str, outcome: &str, duration: Option<Duration>) {
    TOOL_CALLS_TOTAL.with_label_values(&[tool, outcome]).inc();

    if let Some(duration) = duration {
        TOOL_CALL_DURATION_SECONDS
            .with_label_values(&[tool])
            .observe(duration.as_secs_f64());
    }
}

/// Update active sessions count
pub fn set_active_sessions(count: usize) {
    ACTIVE_SESSIONS.set(count as f64);
}

pub fn record_sessions_evicted(count: usize) {
    SESSIONS_EVICTED_TOTAL.inc_by(count as f64);
}

pub fn record_category_enabled(category: &str) {
    CATEGORIES_ENABLED_TOTAL
        .with_label_values(&[category])
        .inc();
}

/// Record the outcome of a consent exchange
pub fn record_consent_decision(outcome: &str) {
    CONSENT_DECISIONS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
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

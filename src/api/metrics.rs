//! Prometheus metrics endpoint and HTTP request tracking middleware.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;

use crate::AppState;

// Metric names as constants for consistency
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const FRAUD_CHECKS_TOTAL: &str = "fraud_checks_total";
pub const CHAT_MESSAGES_FANNED_OUT_TOTAL: &str = "chat_messages_fanned_out_total";
pub const CHECKOUTS_TOTAL: &str = "checkouts_total";

/// Initialize the Prometheus metrics recorder and return a handle for
/// rendering metrics. Called once during startup.
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    describe_counter!(
        HTTP_REQUESTS_TOTAL,
        "Total number of HTTP requests received"
    );
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(
        FRAUD_CHECKS_TOTAL,
        "Price-change evaluations by outcome (ok/suspicious)"
    );
    describe_counter!(
        CHAT_MESSAGES_FANNED_OUT_TOTAL,
        "Chat payload deliveries to live subscribers"
    );
    describe_counter!(CHECKOUTS_TOTAL, "Completed mock checkouts");

    handle
}

/// GET /metrics - Returns Prometheus-formatted metrics. Unauthenticated.
pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics_handle.as_ref() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Metrics not initialized".to_string(),
        ),
    }
}

/// Middleware to track HTTP request counts and durations.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();

    // Use the matched path so templates like /articles/:id aggregate
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let method = request.method().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

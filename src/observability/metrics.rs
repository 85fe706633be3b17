//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by method, status
//! - `edge_request_duration_seconds` (histogram): end-to-end latency
//! - `edge_rate_limited_total` (counter): requests rejected with 429
//! - `edge_cache_results_total` (counter): cache lookups by result (HIT/MISS/STALE)
//! - `edge_origin_failures_total` (counter): origin timeouts and errors by origin
//! - `edge_blocked_total` (counter): requests rejected by the country filter

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe();
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

fn describe() {
    describe_counter!("edge_requests_total", "Requests served by the edge dispatcher");
    describe_histogram!(
        "edge_request_duration_seconds",
        "End-to-end request latency in seconds"
    );
    describe_counter!("edge_rate_limited_total", "Requests rejected by the rate limiter");
    describe_counter!("edge_cache_results_total", "Cache lookups by result");
    describe_counter!("edge_origin_failures_total", "Origin fetch failures and timeouts");
    describe_counter!("edge_blocked_total", "Requests rejected by the country filter");
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!("edge_requests_total", "method" => method.to_string(), "status" => status.clone())
        .increment(1);
    histogram!("edge_request_duration_seconds", "method" => method.to_string(), "status" => status)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("edge_rate_limited_total").increment(1);
}

pub fn record_cache_result(result: &'static str) {
    counter!("edge_cache_results_total", "result" => result).increment(1);
}

pub fn record_origin_failure(origin: &'static str, reason: &'static str) {
    counter!("edge_origin_failures_total", "origin" => origin, "reason" => reason).increment(1);
}

pub fn record_blocked(country: &str) {
    counter!("edge_blocked_total", "country" => country.to_string()).increment(1);
}

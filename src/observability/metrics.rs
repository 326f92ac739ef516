//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by endpoint, status, cache result
//! - `proxy_request_duration_seconds` (histogram): end-to-end handling latency
//! - `proxy_upstream_requests_total` (counter): upstream calls by outcome
//! - `proxy_upstream_duration_seconds` (histogram): upstream call latency
//! - `proxy_cache_entries` (gauge): entries currently held by the response cache

use metrics::Label;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one handled proxy request.
pub fn record_request(endpoint: &str, status: u16, cache: &'static str, start: Instant) {
    let labels = vec![
        Label::new("endpoint", endpoint.to_string()),
        Label::new("status", status.to_string()),
        Label::new("cache", cache),
    ];
    metrics::counter!("proxy_requests_total", labels.clone()).increment(1);
    metrics::histogram!("proxy_request_duration_seconds", labels)
        .record(start.elapsed().as_secs_f64());
}

/// Record one upstream call.
pub fn record_upstream_call(outcome: &'static str, start: Instant) {
    metrics::counter!("proxy_upstream_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("proxy_upstream_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record the current number of cached responses.
pub fn record_cache_size(entries: usize) {
    metrics::gauge!("proxy_cache_entries").set(entries as f64);
}

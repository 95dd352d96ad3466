//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, breaker activity)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, routing key
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_breaker_transitions_total` (counter): breaker state changes by target state
//! - `gateway_breaker_rejections_total` (counter): calls short-circuited by an open breaker
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - Labels stay low-cardinality: routing keys, never full paths

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one completed gateway request.
pub fn record_request(method: &str, status: u16, routing_key: &str, start: Instant) {
    let status = status.to_string();
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.clone(),
        "routing_key" => routing_key.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status,
        "routing_key" => routing_key.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record a breaker moving into state `to`.
pub fn record_breaker_transition(breaker: &str, to: &'static str) {
    counter!(
        "gateway_breaker_transitions_total",
        "breaker" => breaker.to_string(),
        "to" => to
    )
    .increment(1);
}

/// Record a call rejected without reaching the protected operation.
pub fn record_breaker_rejection(breaker: &str) {
    counter!("gateway_breaker_rejections_total", "breaker" => breaker.to_string()).increment(1);
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, service
//! - `gateway_request_duration_seconds` (histogram): latency per service
//! - `gateway_rate_limited_total` (counter): rejected admissions
//! - `gateway_rate_limit_keys` (gauge): admission keys currently tracked
//! - `gateway_circuit_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `gateway_circuit_rejections_total` (counter): calls failed fast
//! - `gateway_bulkhead_rejections_total` (counter): calls over the concurrency cap
//! - `gateway_bulkhead_in_flight` (gauge): current concurrent calls
//! - `gateway_retries_total` (counter): retry attempts
//!
//! # Design Decisions
//! - Low-overhead metric updates through the `metrics` facade
//! - Labels for service, method, status code
//! - Without an installed recorder every call is a no-op

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, service: &str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "service" => service.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "service" => service.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("gateway_rate_limited_total").increment(1);
}

pub fn record_rate_limit_keys(count: usize) {
    gauge!("gateway_rate_limit_keys").set(count as f64);
}

pub fn record_circuit_state(service: &str, state: CircuitState) {
    gauge!("gateway_circuit_state", "service" => service.to_string()).set(state as u8 as f64);
}

pub fn record_circuit_rejection(service: &str) {
    counter!("gateway_circuit_rejections_total", "service" => service.to_string()).increment(1);
}

pub fn record_bulkhead_rejection(service: &str) {
    counter!("gateway_bulkhead_rejections_total", "service" => service.to_string()).increment(1);
}

pub fn record_bulkhead_in_flight(service: &str, in_flight: usize) {
    gauge!("gateway_bulkhead_in_flight", "service" => service.to_string()).set(in_flight as f64);
}

pub fn record_retry(service: &str) {
    counter!("gateway_retries_total", "service" => service.to_string()).increment(1);
}

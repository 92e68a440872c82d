//! Metrics collection and exposition.
//!
//! # Metrics
//! - `verifier_attempts_total` (counter): poll attempts by kind, result
//! - `verifier_verifications_total` (counter): finished verifications by kind, outcome
//! - `verifier_verification_duration_seconds` (histogram): time to a terminal outcome
//! - `verifier_http_requests_total` (counter): API requests by route, status
//!
//! Recording is a no-op until `init_metrics` installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count one poll attempt.
pub fn record_attempt(kind: &'static str, result: &'static str) {
    counter!("verifier_attempts_total", "kind" => kind, "result" => result).increment(1);
}

/// Count a finished verification and its duration.
pub fn record_verification(kind: &'static str, outcome: &'static str, started: Instant) {
    counter!("verifier_verifications_total", "kind" => kind, "outcome" => outcome).increment(1);
    histogram!("verifier_verification_duration_seconds", "kind" => kind)
        .record(started.elapsed().as_secs_f64());
}

/// Count an API request.
pub fn record_request(route: &'static str, status: u16) {
    counter!("verifier_http_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
}

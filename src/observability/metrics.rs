//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, backend
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_circuit_transitions_total` (counter): breaker state changes by app, backend
//! - `proxy_backend_circuit_state` (gauge): 0=closed, 1=half-open, 2=open, by app, backend
//! - `proxy_app_registrations_total` (counter): control-plane outcomes
//!
//! # Design Decisions
//! - Low-overhead metric updates through the `metrics` facade
//! - Without an installed recorder every call is a no-op (tests, CLI)
//! - Prometheus exporter serves its own HTTP listener

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a completed data-plane request.
pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("backend", backend.to_string()),
    ];
    counter!("proxy_requests_total", &labels).increment(1);
    histogram!("proxy_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

/// Record a circuit breaker state change.
///
/// Labelled by app as well as backend: apps sharing a host:port keep
/// separate timelines.
pub fn record_circuit_transition(app: &str, backend: &str, from: CircuitState, to: CircuitState) {
    counter!(
        "proxy_circuit_transitions_total",
        "app" => app.to_string(),
        "backend" => backend.to_string(),
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    gauge!(
        "proxy_backend_circuit_state",
        "app" => app.to_string(),
        "backend" => backend.to_string()
    )
    .set(state_value(to));
}

/// Record the result of a control-plane registration.
pub fn record_registration(result: &'static str) {
    counter!("proxy_app_registrations_total", "result" => result).increment(1);
}

fn state_value(state: CircuitState) -> f64 {
    match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    }
}

//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define relay metrics (resolutions, attempts, throttling)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `relay_resolves_total` (counter): finished resolutions by outcome
//! - `relay_resolve_duration_seconds` (histogram): end-to-end latency by outcome
//! - `relay_attempts_total` (counter): upstream attempts by strategy, result
//! - `relay_rate_limited_total` (counter): requests throttled, by scope
//!
//! # Design Decisions
//! - Label values are the stable outcome/result tags, never free text
//! - Recording without an installed exporter is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`. Failure to bind is
/// logged, not fatal: the relay must keep serving without metrics.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(err) => tracing::error!(error = %err, "failed to install metrics exporter"),
    }
}

/// One finished `resolve()` call.
pub fn record_resolve(outcome: &str, started: Instant) {
    counter!("relay_resolves_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("relay_resolve_duration_seconds", "outcome" => outcome.to_string())
        .record(started.elapsed().as_secs_f64());
}

/// One upstream attempt, successful or not.
pub fn record_attempt(strategy: &str, result: &str) {
    counter!(
        "relay_attempts_total",
        "strategy" => strategy.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// One inbound request rejected by the client rate limiter.
pub fn record_rate_limited(scope: &str) {
    counter!("relay_rate_limited_total", "scope" => scope.to_string()).increment(1);
}

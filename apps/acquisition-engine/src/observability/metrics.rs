//! Prometheus metrics for the acquisition engine.
//!
//! # Example
//!
//! ```ignore
//! use acquisition_engine::observability::{init_metrics, record_attempt};
//!
//! init_metrics(9464)?;
//! record_attempt(Classification::TooEarly);
//! ```

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::domain::acquisition::Classification;

/// Latency buckets from 10ms to 10s.
const LATENCY_BUCKETS: &[f64] = &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Initialize the Prometheus metrics exporter on `0.0.0.0:{port}`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port already in use).
pub fn init_metrics(port: u16) -> Result<(), MetricsError> {
    let listen_addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .set_buckets(LATENCY_BUCKETS)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(addr = %listen_addr, "Prometheus metrics exporter started");

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

/// Record one classified load.
pub fn record_attempt(outcome: Classification) {
    counter!("acquisition_attempts_total", "outcome" => outcome.as_str()).increment(1);
}

/// Record a finished execution.
///
/// * `result` - `success` or `failure`
/// * `code` - error code for failures, `none` for successes
pub fn record_execution(result: &'static str, code: &'static str) {
    counter!(
        "acquisition_executions_total",
        "result" => result,
        "code" => code
    )
    .increment(1);
}

/// Record the latency of the final protocol submission.
pub fn record_submit_latency(latency_seconds: f64) {
    histogram!("acquisition_submit_latency_seconds").record(latency_seconds);
}

/// Record how far from the send instant the first load actually left.
pub fn record_send_skew(skew_seconds: f64) {
    histogram!("acquisition_send_skew_seconds").record(skew_seconds);
}

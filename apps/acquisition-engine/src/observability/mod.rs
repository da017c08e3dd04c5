//! Observability: structured logging and Prometheus metrics.

mod metrics;
mod tracing;

pub use metrics::{
    MetricsError, init_metrics, record_attempt, record_execution, record_send_skew,
    record_submit_latency,
};
pub use tracing::{TracingError, env_filter, init_tracing};

//! Time Probe Port (Driven Port)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Probe error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// Network failure.
    #[error("probe transport error: {0}")]
    Transport(String),

    /// Reply carried no usable time.
    #[error("probe reply has no server time: {0}")]
    NoServerTime(String),
}

/// Port for the lightweight remote time endpoint.
#[async_trait]
pub trait TimeProbe: Send + Sync {
    /// Server time reported by one probe.
    async fn server_time(&self) -> Result<DateTime<Utc>, ProbeError>;
}

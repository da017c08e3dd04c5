//! Retry limits.

use serde::{Deserialize, Serialize};

use crate::domain::acquisition::MAX_RETRIES;

/// Retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Loads per unit for retryable outcomes.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Executions per request before the store marks it failed for good.
    #[serde(default = "default_max_request_attempts")]
    pub max_request_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            max_request_attempts: default_max_request_attempts(),
        }
    }
}

const fn default_max_retries() -> u32 {
    MAX_RETRIES
}

const fn default_max_request_attempts() -> u32 {
    3
}

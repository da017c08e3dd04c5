//! Settle delays.

use serde::{Deserialize, Serialize};

/// Delays, in milliseconds, for each settle purpose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleConfig {
    /// After each control selection.
    #[serde(default = "default_selection_ms")]
    pub selection_ms: u64,
    /// Before waiting for token readiness.
    #[serde(default = "default_token_ms")]
    pub token_ms: u64,
    /// Bounded wait for the hold field during classification.
    #[serde(default = "default_field_timeout_ms")]
    pub field_timeout_ms: u64,
    /// Bounded wait for token readiness.
    #[serde(default = "default_token_timeout_ms")]
    pub token_timeout_ms: u64,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            selection_ms: default_selection_ms(),
            token_ms: default_token_ms(),
            field_timeout_ms: default_field_timeout_ms(),
            token_timeout_ms: default_token_timeout_ms(),
        }
    }
}

const fn default_selection_ms() -> u64 {
    300
}

const fn default_token_ms() -> u64 {
    150
}

const fn default_field_timeout_ms() -> u64 {
    1_500
}

const fn default_token_timeout_ms() -> u64 {
    5_000
}

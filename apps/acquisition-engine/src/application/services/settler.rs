//! Settle delay implementations.

use async_trait::async_trait;
use std::time::Duration;

use crate::application::ports::{SettlePurpose, Settler};
use crate::config::SettleConfig;

/// Sleeps for the configured duration of each purpose.
#[derive(Debug, Clone)]
pub struct TimedSettler {
    after_selection: Duration,
    before_token: Duration,
}

impl TimedSettler {
    /// Create a settler with explicit delays.
    #[must_use]
    pub const fn new(after_selection: Duration, before_token: Duration) -> Self {
        Self {
            after_selection,
            before_token,
        }
    }

    /// Create a settler from configuration.
    #[must_use]
    pub const fn from_config(config: &SettleConfig) -> Self {
        Self::new(
            Duration::from_millis(config.selection_ms),
            Duration::from_millis(config.token_ms),
        )
    }

    /// Delay for `purpose`.
    #[must_use]
    pub const fn delay(&self, purpose: SettlePurpose) -> Duration {
        match purpose {
            SettlePurpose::AfterSelection => self.after_selection,
            SettlePurpose::BeforeToken => self.before_token,
        }
    }
}

#[async_trait]
impl Settler for TimedSettler {
    async fn settle(&self, purpose: SettlePurpose) {
        let delay = self.delay(purpose);
        if !delay.is_zero() {
            tracing::trace!(%purpose, delay_ms = delay.as_millis() as u64, "Settling");
            tokio::time::sleep(delay).await;
        }
    }
}

/// Returns immediately. For tests and dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantSettler;

#[async_trait]
impl Settler for InstantSettler {
    async fn settle(&self, _purpose: SettlePurpose) {}
}

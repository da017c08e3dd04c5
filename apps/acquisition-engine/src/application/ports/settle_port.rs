//! Settle Port (Driven Port)
//!
//! The only non-clock waits on the acquisition path go through here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the flow is pausing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlePurpose {
    /// After a control selection on the interactive view.
    AfterSelection,
    /// Before waiting for the submission token to become mintable.
    BeforeToken,
}

impl fmt::Display for SettlePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AfterSelection => write!(f, "after_selection"),
            Self::BeforeToken => write!(f, "before_token"),
        }
    }
}

/// Port for settle delays.
#[async_trait]
pub trait Settler: Send + Sync {
    /// Pause for the configured duration of `purpose`.
    async fn settle(&self, purpose: SettlePurpose);
}

//! Closed outcome set for a loaded candidate view.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of one candidate view load.
///
/// The retry table in [`super::unit_state`] matches on this exhaustively, so a
/// new outcome cannot be added without deciding how it is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// The view carries a hold and can be configured and submitted.
    Ready,
    /// The window has not opened yet (wait message with a countdown).
    TooEarly,
    /// Another party is already mid-reservation on this unit.
    HeldByOther,
    /// Generic remote failure page or transport error.
    TransientError,
    /// Failure page with wording the marker table does not know.
    Unrecognized,
    /// Normal page whose hold field never appeared within the bounded wait.
    SlowToLoad,
}

impl Classification {
    /// Stable upper-case name, used in logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::TooEarly => "TOO_EARLY",
            Self::HeldByOther => "HELD_BY_OTHER",
            Self::TransientError => "TRANSIENT_ERROR",
            Self::Unrecognized => "UNRECOGNIZED",
            Self::SlowToLoad => "SLOW_TO_LOAD",
        }
    }

    /// Returns true if another load of the same unit may change the outcome.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TooEarly | Self::SlowToLoad | Self::Unrecognized)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_outcomes() {
        assert!(Classification::TooEarly.is_retryable());
        assert!(Classification::SlowToLoad.is_retryable());
        assert!(Classification::Unrecognized.is_retryable());
        assert!(!Classification::HeldByOther.is_retryable());
        assert!(!Classification::TransientError.is_retryable());
        assert!(!Classification::Ready.is_retryable());
    }

    #[test]
    fn display_matches_serde_name() {
        let json = serde_json::to_string(&Classification::HeldByOther).unwrap();
        assert_eq!(json, format!("\"{}\"", Classification::HeldByOther));
    }
}

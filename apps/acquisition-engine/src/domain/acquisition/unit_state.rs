//! Per-unit retry/fallback state machine.
//!
//! ```text
//! NotStarted ──► Attempting ──► Acquired
//!                 │   ▲
//!                 │   └── RetryPending (retryable, attempts < max)
//!                 ▼
//!             Abandoned
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::classification::Classification;
use crate::domain::shared::UnitId;

/// Maximum number of loads of one unit for retryable outcomes.
pub const MAX_RETRIES: u32 = 2;

/// Lifecycle state of one resource unit within an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitState {
    /// Not yet loaded.
    NotStarted,
    /// A load (and possibly the submission flow) is in flight.
    Attempting,
    /// Last load was retryable; the next load fires immediately.
    RetryPending,
    /// Unit given up; the controller moves to the next one.
    Abandoned,
    /// Reservation confirmed on this unit.
    Acquired,
}

impl UnitState {
    /// Returns true if no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Abandoned | Self::Acquired)
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Attempting => "ATTEMPTING",
            Self::RetryPending => "RETRY_PENDING",
            Self::Abandoned => "ABANDONED",
            Self::Acquired => "ACQUIRED",
        };
        write!(f, "{name}")
    }
}

/// Why a unit was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbandonReason {
    /// Retryable outcomes used up every allowed load.
    ExhaustedRetries {
        /// Outcome of the final load.
        last: Classification,
    },
    /// Outcome that is never retried (held by another party, transient error).
    NotRetryable {
        /// The outcome.
        outcome: Classification,
    },
    /// The view never exposed a hold id.
    HoldMissing,
    /// The submission token could not be minted.
    TokenUnavailable {
        /// Error details.
        detail: String,
    },
    /// The remote service rejected the submission.
    SubmissionRejected {
        /// Error details.
        detail: String,
    },
    /// A session call failed mid-flow.
    Transport {
        /// Error details.
        detail: String,
    },
}

impl fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExhaustedRetries { last } => write!(f, "exhausted retries (last: {last})"),
            Self::NotRetryable { outcome } => match outcome {
                Classification::HeldByOther => write!(f, "held by another party"),
                other => write!(f, "not retryable ({other})"),
            },
            Self::HoldMissing => write!(f, "hold id missing from view"),
            Self::TokenUnavailable { detail } => write!(f, "token unavailable: {detail}"),
            Self::SubmissionRejected { detail } => write!(f, "submission rejected: {detail}"),
            Self::Transport { detail } => write!(f, "transport error: {detail}"),
        }
    }
}

/// What the controller should do after a classified load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitDecision {
    /// Run the configuration and submission flow.
    Proceed,
    /// Reload the same unit immediately.
    Retry,
    /// Give up on this unit.
    Abandon(AbandonReason),
}

/// Invalid unit state transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid unit transition for {unit}: {from} -> {to}")]
pub struct UnitTransitionError {
    /// Unit being tracked.
    pub unit: UnitId,
    /// Current state.
    pub from: UnitState,
    /// Attempted state.
    pub to: UnitState,
}

/// Validates unit state transitions.
pub struct UnitStateMachine;

impl UnitStateMachine {
    /// Check if a state transition is valid.
    #[must_use]
    pub const fn is_valid_transition(from: UnitState, to: UnitState) -> bool {
        matches!(
            (from, to),
            (UnitState::NotStarted | UnitState::RetryPending, UnitState::Attempting)
                | (
                    UnitState::Attempting,
                    UnitState::RetryPending | UnitState::Abandoned | UnitState::Acquired
                )
        )
    }
}

/// Tracks one unit through its attempts.
#[derive(Debug, Clone)]
pub struct UnitTracker {
    unit: UnitId,
    state: UnitState,
    attempts: u32,
    max_attempts: u32,
    last_outcome: Option<Classification>,
    abandon_reason: Option<AbandonReason>,
}

impl UnitTracker {
    /// Create a tracker allowing `max_attempts` loads for retryable outcomes.
    #[must_use]
    pub fn new(unit: UnitId, max_attempts: u32) -> Self {
        Self {
            unit,
            state: UnitState::NotStarted,
            attempts: 0,
            max_attempts: max_attempts.max(1),
            last_outcome: None,
            abandon_reason: None,
        }
    }

    /// Create a tracker with the default [`MAX_RETRIES`].
    #[must_use]
    pub fn with_default_limit(unit: UnitId) -> Self {
        Self::new(unit, MAX_RETRIES)
    }

    /// The unit being tracked.
    #[must_use]
    pub const fn unit(&self) -> &UnitId {
        &self.unit
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> UnitState {
        self.state
    }

    /// Number of loads started so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Outcome of the most recent load.
    #[must_use]
    pub const fn last_outcome(&self) -> Option<Classification> {
        self.last_outcome
    }

    /// Reason the unit was abandoned, if it was.
    #[must_use]
    pub const fn abandon_reason(&self) -> Option<&AbandonReason> {
        self.abandon_reason.as_ref()
    }

    /// Start a load. Returns the 1-based attempt index.
    pub fn begin_attempt(&mut self) -> Result<u32, UnitTransitionError> {
        self.transition(UnitState::Attempting)?;
        self.attempts += 1;
        Ok(self.attempts)
    }

    /// Record the classification of the load in flight and decide what's next.
    pub fn record(&mut self, outcome: Classification) -> Result<UnitDecision, UnitTransitionError> {
        if self.state != UnitState::Attempting {
            return Err(self.error(UnitState::Attempting));
        }
        self.last_outcome = Some(outcome);

        match outcome {
            Classification::Ready => Ok(UnitDecision::Proceed),
            Classification::TooEarly | Classification::SlowToLoad | Classification::Unrecognized => {
                if self.attempts < self.max_attempts {
                    self.transition(UnitState::RetryPending)?;
                    Ok(UnitDecision::Retry)
                } else {
                    let reason = AbandonReason::ExhaustedRetries { last: outcome };
                    self.abandon(reason.clone())?;
                    Ok(UnitDecision::Abandon(reason))
                }
            }
            Classification::HeldByOther | Classification::TransientError => {
                let reason = AbandonReason::NotRetryable { outcome };
                self.abandon(reason.clone())?;
                Ok(UnitDecision::Abandon(reason))
            }
        }
    }

    /// Mark the unit acquired after a confirmed submission.
    pub fn mark_acquired(&mut self) -> Result<(), UnitTransitionError> {
        self.transition(UnitState::Acquired)
    }

    /// Abandon the unit.
    pub fn abandon(&mut self, reason: AbandonReason) -> Result<(), UnitTransitionError> {
        self.transition(UnitState::Abandoned)?;
        self.abandon_reason = Some(reason);
        Ok(())
    }

    fn transition(&mut self, to: UnitState) -> Result<(), UnitTransitionError> {
        if UnitStateMachine::is_valid_transition(self.state, to) {
            self.state = to;
            Ok(())
        } else {
            Err(self.error(to))
        }
    }

    fn error(&self, to: UnitState) -> UnitTransitionError {
        UnitTransitionError {
            unit: self.unit.clone(),
            from: self.state,
            to,
        }
    }
}

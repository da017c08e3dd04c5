//! Error taxonomy for the acquisition engine.
//!
//! Errors are either unit-scoped or session-scoped:
//!
//! | Scope | Variants | Effect |
//! |-------|----------|--------|
//! | Unit | `ClassificationAmbiguous`, `TransientNetwork`, `ResourceHeld`, `TokenMint`, `ProtocolSubmission` | Unit abandoned, next unit tried |
//! | Session | `Authentication`, `SessionLost`, `Credentials`, `Configuration`, `Cancelled`, `InvalidTransition` | Execution aborts |
//! | Terminal | `AllUnitsExhausted` | Every candidate abandoned |
//!
//! Whatever the scope, the caller receives exactly one `ExecutionResult`
//! whose reason is the `Display` of the error that ended the execution.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::acquisition::{AbandonReason, Classification, UnitTransitionError};
use crate::domain::reservation::RequestError;
use crate::domain::shared::UnitId;
use crate::domain::slot_config::SlotError;

/// How far an error reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorScope {
    /// Abandons the current unit only.
    Unit,
    /// Aborts the whole execution.
    Session,
}

/// Acquisition errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    /// The remote rejected the credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The view could not be classified after every allowed load.
    #[error("unit {unit}: classification ambiguous ({last})")]
    ClassificationAmbiguous {
        /// Unit.
        unit: UnitId,
        /// Last classification.
        last: Classification,
    },

    /// Network or remote failure while working a unit.
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// Another party holds the slot.
    #[error("unit {unit}: held by another party")]
    ResourceHeld {
        /// Unit.
        unit: UnitId,
    },

    /// The submission token could not be minted.
    #[error("unit {unit}: token mint failed: {detail}")]
    TokenMint {
        /// Unit.
        unit: UnitId,
        /// Error details.
        detail: String,
    },

    /// The final write was rejected.
    #[error("unit {unit}: submission failed: {detail}")]
    ProtocolSubmission {
        /// Unit.
        unit: UnitId,
        /// Error details.
        detail: String,
    },

    /// Every candidate unit was abandoned.
    #[error("all units exhausted: {summary}")]
    AllUnitsExhausted {
        /// One entry per attempted unit.
        summary: String,
    },

    /// Session identity lost and cannot be recovered.
    #[error("session lost: {0}")]
    SessionLost(String),

    /// Credentials could not be decrypted.
    #[error("credentials unavailable: {0}")]
    Credentials(String),

    /// Request or configuration cannot be executed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Execution was cancelled.
    #[error("execution cancelled")]
    Cancelled,

    /// Unit state machine rejected a transition.
    #[error(transparent)]
    InvalidTransition(#[from] UnitTransitionError),
}

impl AcquisitionError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "AUTHENTICATION",
            Self::ClassificationAmbiguous { .. } => "CLASSIFICATION_AMBIGUOUS",
            Self::TransientNetwork(_) => "TRANSIENT_NETWORK",
            Self::ResourceHeld { .. } => "RESOURCE_HELD",
            Self::TokenMint { .. } => "TOKEN_MINT",
            Self::ProtocolSubmission { .. } => "PROTOCOL_SUBMISSION",
            Self::AllUnitsExhausted { .. } => "ALL_UNITS_EXHAUSTED",
            Self::SessionLost(_) => "SESSION_LOST",
            Self::Credentials(_) => "CREDENTIALS",
            Self::Configuration(_) => "CONFIGURATION",
            Self::Cancelled => "CANCELLED",
            Self::InvalidTransition(_) => "INVALID_TRANSITION",
        }
    }

    /// Scope of the error.
    #[must_use]
    pub const fn scope(&self) -> ErrorScope {
        match self {
            Self::ClassificationAmbiguous { .. }
            | Self::TransientNetwork(_)
            | Self::ResourceHeld { .. }
            | Self::TokenMint { .. }
            | Self::ProtocolSubmission { .. } => ErrorScope::Unit,
            Self::Authentication(_)
            | Self::AllUnitsExhausted { .. }
            | Self::SessionLost(_)
            | Self::Credentials(_)
            | Self::Configuration(_)
            | Self::Cancelled
            | Self::InvalidTransition(_) => ErrorScope::Session,
        }
    }

    /// Returns true if the error aborts the execution.
    #[must_use]
    pub const fn is_session_scoped(&self) -> bool {
        matches!(self.scope(), ErrorScope::Session)
    }

    /// Unit-scoped error corresponding to an abandon reason.
    #[must_use]
    pub fn from_abandon(unit: &UnitId, reason: &AbandonReason) -> Self {
        match reason {
            AbandonReason::ExhaustedRetries { last } => Self::ClassificationAmbiguous {
                unit: unit.clone(),
                last: *last,
            },
            AbandonReason::NotRetryable {
                outcome: Classification::HeldByOther,
            } => Self::ResourceHeld { unit: unit.clone() },
            AbandonReason::NotRetryable { outcome } => {
                Self::TransientNetwork(format!("unit {unit}: {outcome}"))
            }
            AbandonReason::HoldMissing => Self::ProtocolSubmission {
                unit: unit.clone(),
                detail: reason.to_string(),
            },
            AbandonReason::TokenUnavailable { detail } => Self::TokenMint {
                unit: unit.clone(),
                detail: detail.clone(),
            },
            AbandonReason::SubmissionRejected { detail } => Self::ProtocolSubmission {
                unit: unit.clone(),
                detail: detail.clone(),
            },
            AbandonReason::Transport { detail } => {
                Self::TransientNetwork(format!("unit {unit}: {detail}"))
            }
        }
    }
}

impl From<SlotError> for AcquisitionError {
    fn from(err: SlotError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<RequestError> for AcquisitionError {
    fn from(err: RequestError) -> Self {
        Self::Configuration(err.to_string())
    }
}

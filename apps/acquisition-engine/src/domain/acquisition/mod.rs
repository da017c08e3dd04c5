//! Acquisition Bounded Context
//!
//! Classification of candidate views, the per-unit retry state machine and
//! interpretation of the final submission.

pub mod classification;
pub mod markers;
pub mod submission;
pub mod unit_state;

pub use classification::Classification;
pub use markers::MarkerTable;
pub use submission::{RedirectRules, SubmissionForm, SubmissionResponse, SubmissionVerdict};
pub use unit_state::{
    AbandonReason, MAX_RETRIES, UnitDecision, UnitState, UnitStateMachine, UnitTracker,
    UnitTransitionError,
};

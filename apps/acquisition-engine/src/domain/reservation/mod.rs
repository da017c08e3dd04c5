//! Reservation Bounded Context
//!
//! The request consumed by the coordinator and the single result it produces.

pub mod request;
pub mod result;

#[cfg(test)]
pub(crate) use request::fixtures;
pub use request::{
    DesiredSlot, EncryptedCredential, Participant, RequestError, ReservationRequest,
    ReservationVariant,
};
pub use result::{AcquisitionAttempt, ExecutionResult, UnitSummary};

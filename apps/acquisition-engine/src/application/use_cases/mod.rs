//! Application Use Cases
//!
//! Use cases orchestrate domain logic to fulfill application requirements.

mod execute_reservation;
mod process_reservations;
mod token_handoff;

pub use execute_reservation::{
    ExecuteReservationUseCase, Execution, ExecutionPorts, ExecutionSettings,
};
pub use process_reservations::{BatchReport, ProcessReservationsUseCase, ProcessedRequest};
pub use token_handoff::{HandoffError, HandoffFields, TokenHandoff, UnitFailure};

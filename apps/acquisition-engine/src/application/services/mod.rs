//! Application Services
//!
//! Stateful helpers used by the execution coordinator: clock sync, response
//! classification and settle delays.

mod clock_sync;
mod response_classifier;
mod settler;

pub use clock_sync::ClockSynchronizer;
pub use response_classifier::{ClassifiedView, ResponseClassifier};
pub use settler::{InstantSettler, TimedSettler};

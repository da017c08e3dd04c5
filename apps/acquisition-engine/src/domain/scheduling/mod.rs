//! Scheduling Bounded Context
//!
//! When the window opens, and how to land the first request on that instant.

pub mod sync_estimate;
pub mod window;

pub use sync_estimate::{
    ProbeSample, SyncEstimate, SyncSource, estimate_from_samples, send_offset_ms,
};
pub use window::{ExecutionPlan, ExecutionStrategy, WindowRule};

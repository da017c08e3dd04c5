//! Application Layer
//!
//! - `ports`: interfaces to the remote service, the store and credentials
//! - `services`: clock sync, response classification, settle delays
//! - `use_cases`: the execution coordinator and batch processing

pub mod ports;
pub mod services;
pub mod use_cases;

//! Domain Layer
//!
//! Pure types and rules with no I/O:
//!
//! - `shared`: identifiers
//! - `scheduling`: window open-time and clock-sync math
//! - `acquisition`: classification, per-unit retry state machine, redirect rules
//! - `slot_config`: variant/party-size to submission field resolution
//! - `reservation`: request and result

pub mod acquisition;
pub mod reservation;
pub mod scheduling;
pub mod shared;
pub mod slot_config;

// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Acquisition Engine - Rust Core Library
//!
//! Time-synchronized acquisition of daily-released reservation slots on a
//! remote booking service.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core logic with no I/O
//!   - `acquisition`: classifications, the per-unit retry machine, text
//!     markers, submission redirects
//!   - `scheduling`: window rule, execution plans, clock-sync estimates
//!   - `reservation`: requests, attempts, execution results
//!   - `slot_config`: (variant, party size) → form fields and selections
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: `AcquisitionSession`, `ProtocolSubmitter`, `TimeProbe`,
//!     `CredentialDecryptor`, `ReservationStore`, `Settler`
//!   - `services`: clock synchronizer, response classifier, settlers
//!   - `use_cases`: `ExecuteReservation`, `ProcessReservations`, token handoff
//!
//! - **Infrastructure**: Adapters
//!   - `remote`: HTTP session, submitter and time probe (reqwest), scripted
//!     doubles
//!   - `persistence`: in-memory request store
//!   - `credentials`: pass-through decryptor

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// YAML configuration with environment interpolation.
pub mod config;

/// Error taxonomy of one execution.
pub mod error;

/// Logging and metrics.
pub mod observability;

// =============================================================================
// Re-exports
// =============================================================================

pub use application::use_cases::{
    BatchReport, ExecuteReservationUseCase, Execution, ExecutionPorts, ProcessReservationsUseCase,
};
pub use config::{Config, ConfigError, load_config};
pub use domain::acquisition::Classification;
pub use domain::reservation::{ExecutionResult, ReservationRequest};
pub use error::AcquisitionError;

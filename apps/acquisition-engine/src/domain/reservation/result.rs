//! Terminal execution result and its diagnostic attempt trail.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::acquisition::{AbandonReason, Classification};
use crate::domain::shared::{ConfirmationId, UnitId};

/// One classified load of one unit. Diagnostic only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcquisitionAttempt {
    /// Unit loaded.
    pub unit: UnitId,
    /// 1-based attempt index within the unit.
    pub attempt: u32,
    /// Classification of the load.
    pub outcome: Classification,
    /// Local time the load started.
    pub started_at: DateTime<Utc>,
    /// Local time the classification finished.
    pub finished_at: DateTime<Utc>,
}

/// Final state of one attempted unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitSummary {
    /// Unit.
    pub unit: UnitId,
    /// Loads made.
    pub attempts: u32,
    /// Classification of the last load.
    pub final_classification: Option<Classification>,
    /// Why it was abandoned; `None` for the acquired unit.
    pub abandon_reason: Option<AbandonReason>,
}

/// Exactly one per consumed request.
///
/// Fields are private so a success always carries a unit and a confirmation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    success: bool,
    confirmation_id: Option<ConfirmationId>,
    acquired_unit: Option<UnitId>,
    attempts: Vec<AcquisitionAttempt>,
    units: Vec<UnitSummary>,
    reason: String,
    completed_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// Successful acquisition.
    #[must_use]
    pub fn acquired(
        unit: UnitId,
        confirmation_id: ConfirmationId,
        attempts: Vec<AcquisitionAttempt>,
        units: Vec<UnitSummary>,
    ) -> Self {
        let reason = format!("reserved unit {unit} (confirmation {confirmation_id})");
        Self {
            success: true,
            confirmation_id: Some(confirmation_id),
            acquired_unit: Some(unit),
            attempts,
            units,
            reason,
            completed_at: Utc::now(),
        }
    }

    /// Failed execution with a human-readable reason.
    #[must_use]
    pub fn failed(
        reason: impl Into<String>,
        attempts: Vec<AcquisitionAttempt>,
        units: Vec<UnitSummary>,
    ) -> Self {
        Self {
            success: false,
            confirmation_id: None,
            acquired_unit: None,
            attempts,
            units,
            reason: reason.into(),
            completed_at: Utc::now(),
        }
    }

    /// Whether a reservation was made.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Confirmation id (success only).
    #[must_use]
    pub const fn confirmation_id(&self) -> Option<&ConfirmationId> {
        self.confirmation_id.as_ref()
    }

    /// Acquired unit (success only).
    #[must_use]
    pub const fn acquired_unit(&self) -> Option<&UnitId> {
        self.acquired_unit.as_ref()
    }

    /// Every classified load, in order.
    #[must_use]
    pub fn attempts(&self) -> &[AcquisitionAttempt] {
        &self.attempts
    }

    /// Per-unit summaries, in the order units were tried.
    #[must_use]
    pub fn units(&self) -> &[UnitSummary] {
        &self.units
    }

    /// Human-readable reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// When the execution finished.
    #[must_use]
    pub const fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Units attempted, in order, without repeats.
    #[must_use]
    pub fn attempted_units(&self) -> Vec<UnitId> {
        let mut seen: Vec<UnitId> = Vec::new();
        for attempt in &self.attempts {
            if !seen.contains(&attempt.unit) {
                seen.push(attempt.unit.clone());
            }
        }
        seen
    }

    /// Number of loads made for one unit.
    #[must_use]
    pub fn attempts_for(&self, unit: &UnitId) -> usize {
        self.attempts.iter().filter(|a| &a.unit == unit).count()
    }
}

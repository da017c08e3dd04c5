//! Reservation request as supplied by the upstream store.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::shared::{PrincipalId, RequestId, UnitId};

/// Logical reservation variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationVariant {
    /// Short booking (60 minutes).
    Short,
    /// Long booking (90 minutes).
    Long,
}

impl ReservationVariant {
    /// Booking length in minutes.
    #[must_use]
    pub const fn duration_minutes(&self) -> u32 {
        match self {
            Self::Short => 60,
            Self::Long => 90,
        }
    }
}

impl fmt::Display for ReservationVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Short => write!(f, "short"),
            Self::Long => write!(f, "long"),
        }
    }
}

/// One member of the party. The first participant is the principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Display name.
    pub name: String,
    /// Remote member number, if the participant has one.
    #[serde(default)]
    pub member_id: Option<String>,
}

impl Participant {
    /// Create a participant.
    #[must_use]
    pub fn new(name: impl Into<String>, member_id: Option<String>) -> Self {
        Self {
            name: name.into(),
            member_id,
        }
    }
}

/// Credential reference: decrypted once, right before authentication.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedCredential {
    /// Login name.
    pub username: String,
    /// Encrypted secret, opaque to this engine.
    pub encrypted_secret: String,
}

impl fmt::Debug for EncryptedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedCredential")
            .field("username", &self.username)
            .field("encrypted_secret", &"<redacted>")
            .finish()
    }
}

/// Date and start time the caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredSlot {
    /// Reservation date.
    pub date: NaiveDate,
    /// Start time (remote local time).
    pub time: NaiveTime,
}

/// Invalid reservation request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// No participants.
    #[error("party must contain at least the principal")]
    EmptyParty,

    /// No acceptable units and "accept any" not set.
    #[error("no acceptable units and accept_any_unit is false")]
    NoUnits,

    /// A unit listed twice.
    #[error("unit {0} listed more than once")]
    DuplicateUnit(UnitId),
}

/// A reservation request, consumed exactly once by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    /// Upstream identifier.
    pub id: RequestId,
    /// Account holder.
    pub principal: PrincipalId,
    /// Credential reference.
    pub credential: EncryptedCredential,
    /// Target reservation date.
    pub target_date: NaiveDate,
    /// Target start time.
    pub target_time: NaiveTime,
    /// Variant.
    pub variant: ReservationVariant,
    /// Party, principal first.
    pub party: Vec<Participant>,
    /// Acceptable units in priority order.
    #[serde(default)]
    pub units: Vec<UnitId>,
    /// Fall back to any other known unit after the listed ones.
    #[serde(default)]
    pub accept_any_unit: bool,
}

impl ReservationRequest {
    /// Validate structural invariants.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.party.is_empty() {
            return Err(RequestError::EmptyParty);
        }
        if self.units.is_empty() && !self.accept_any_unit {
            return Err(RequestError::NoUnits);
        }
        for (i, unit) in self.units.iter().enumerate() {
            if self.units[..i].contains(unit) {
                return Err(RequestError::DuplicateUnit(unit.clone()));
            }
        }
        Ok(())
    }

    /// The slot to load for every candidate.
    #[must_use]
    pub const fn desired_slot(&self) -> DesiredSlot {
        DesiredSlot {
            date: self.target_date,
            time: self.target_time,
        }
    }

    /// Units to try, in order: the caller's list, then (if accepting any)
    /// every other known unit in the order given.
    #[must_use]
    pub fn candidate_units(&self, known_units: &[UnitId]) -> Vec<UnitId> {
        let mut units = self.units.clone();
        if self.accept_any_unit {
            for unit in known_units {
                if !units.contains(unit) {
                    units.push(unit.clone());
                }
            }
        }
        units
    }

    /// Party size, principal included.
    #[must_use]
    pub fn party_size(&self) -> usize {
        self.party.len()
    }
}

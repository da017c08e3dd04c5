//! Variant / party-size table mapping to the exact submission field set.
//!
//! Remote quirks live here as data: the party-type field carries one fixed
//! literal for every variant, and every non-primary participant carries a
//! sponsored-by marker naming the primary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::reservation::{Participant, ReservationVariant};

/// Largest party the remote form accepts.
pub const MAX_PARTY_SIZE: usize = 4;

/// Field name of the party-type quirk.
pub const PARTY_TYPE_FIELD: &str = "party_type";

/// The one value the remote accepts for the party-type field.
pub const PARTY_TYPE_VALUE: &str = "1";

/// A literal form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    /// Form field name.
    pub name: String,
    /// Form field value.
    pub value: String,
}

impl FieldValue {
    /// Create a field.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One selection performed on the interactive view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSelection {
    /// Control name.
    pub control: String,
    /// Option value to select.
    pub value: String,
}

impl ControlSelection {
    /// Create a selection.
    #[must_use]
    pub fn new(control: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            control: control.into(),
            value: value.into(),
        }
    }
}

/// Per-participant field name templates. `{index}` is the 0-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantLayout {
    /// Name field template.
    pub name_field: String,
    /// Member id field template.
    pub member_id_field: String,
    /// Sponsored-by field template, emitted for non-primary participants.
    pub sponsored_by_field: String,
}

impl Default for ParticipantLayout {
    fn default() -> Self {
        Self {
            name_field: "participants[{index}][name]".to_string(),
            member_id_field: "participants[{index}][member_id]".to_string(),
            sponsored_by_field: "participants[{index}][sponsored_by]".to_string(),
        }
    }
}

/// Table row for one (variant, party size).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRow {
    /// Variant.
    pub variant: ReservationVariant,
    /// Party size, principal included.
    pub party_size: usize,
    /// Fixed fields for the submission.
    #[serde(default)]
    pub fields: Vec<FieldValue>,
    /// Ordered selections on the interactive view.
    #[serde(default)]
    pub selections: Vec<ControlSelection>,
}

/// Resolution failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// No row for the combination.
    #[error("no slot configuration for {variant} with party of {party_size}")]
    UnknownCombination {
        /// Variant requested.
        variant: ReservationVariant,
        /// Party size requested.
        party_size: usize,
    },

    /// Party is empty.
    #[error("party must contain at least the principal")]
    EmptyParty,
}

/// Resolved configuration for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotConfiguration {
    /// Fixed fields, party-type quirk included.
    pub fields: Vec<FieldValue>,
    /// Ordered selections.
    pub selections: Vec<ControlSelection>,
    /// Participant fields, sponsored-by markers included.
    pub participant_fields: Vec<FieldValue>,
}

/// The resolver table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotTable {
    /// Party-type field name.
    #[serde(default = "default_party_type_field")]
    pub party_type_field: String,
    /// Party-type literal.
    #[serde(default = "default_party_type_value")]
    pub party_type_value: String,
    /// Participant field layout.
    #[serde(default)]
    pub participants: ParticipantLayout,
    /// Rows.
    pub rows: Vec<SlotRow>,
}

fn default_party_type_field() -> String {
    PARTY_TYPE_FIELD.to_string()
}

fn default_party_type_value() -> String {
    PARTY_TYPE_VALUE.to_string()
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SlotTable {
    /// Built-in table: short and long variants for parties of 1 to 4.
    #[must_use]
    pub fn builtin() -> Self {
        let mut rows = Vec::with_capacity(2 * MAX_PARTY_SIZE);
        for variant in [ReservationVariant::Short, ReservationVariant::Long] {
            let duration = variant.duration_minutes().to_string();
            for party_size in 1..=MAX_PARTY_SIZE {
                let players = party_size.to_string();
                rows.push(SlotRow {
                    variant,
                    party_size,
                    fields: vec![
                        FieldValue::new("duration", duration.clone()),
                        FieldValue::new("players", players.clone()),
                    ],
                    selections: vec![
                        ControlSelection::new("duration", duration.clone()),
                        ControlSelection::new("players", players),
                    ],
                });
            }
        }

        Self {
            party_type_field: default_party_type_field(),
            party_type_value: default_party_type_value(),
            participants: ParticipantLayout::default(),
            rows,
        }
    }

    /// Look up the row for a combination.
    #[must_use]
    pub fn row(&self, variant: ReservationVariant, party_size: usize) -> Option<&SlotRow> {
        self.rows
            .iter()
            .find(|r| r.variant == variant && r.party_size == party_size)
    }

    /// Resolve the full configuration for a variant and party.
    pub fn resolve(
        &self,
        variant: ReservationVariant,
        party: &[Participant],
    ) -> Result<SlotConfiguration, SlotError> {
        if party.is_empty() {
            return Err(SlotError::EmptyParty);
        }
        let row = self
            .row(variant, party.len())
            .ok_or(SlotError::UnknownCombination {
                variant,
                party_size: party.len(),
            })?;

        let mut fields = row.fields.clone();
        fields.push(FieldValue::new(
            self.party_type_field.clone(),
            self.party_type_value.clone(),
        ));

        Ok(SlotConfiguration {
            fields,
            selections: row.selections.clone(),
            participant_fields: self.participant_fields(party),
        })
    }

    /// Participant fields in party order.
    ///
    /// The sponsor value is the primary's member id, or their name if they
    /// have none.
    #[must_use]
    pub fn participant_fields(&self, party: &[Participant]) -> Vec<FieldValue> {
        let Some(primary) = party.first() else {
            return Vec::new();
        };
        let sponsor = primary.member_id.as_deref().unwrap_or(&primary.name);
        let layout = &self.participants;

        let mut fields = Vec::with_capacity(party.len() * 3);
        for (index, participant) in party.iter().enumerate() {
            fields.push(FieldValue::new(
                expand(&layout.name_field, index),
                participant.name.clone(),
            ));
            if let Some(member_id) = &participant.member_id {
                fields.push(FieldValue::new(
                    expand(&layout.member_id_field, index),
                    member_id.clone(),
                ));
            }
            if index > 0 {
                fields.push(FieldValue::new(
                    expand(&layout.sponsored_by_field, index),
                    sponsor,
                ));
            }
        }
        fields
    }
}

fn expand(template: &str, index: usize) -> String {
    template.replace("{index}", &index.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn party(n: usize) -> Vec<Participant> {
        (0..n)
            .map(|i| {
                let member = if i == 0 { Some("1001".to_string()) } else { None };
                Participant::new(format!("P{i}"), member)
            })
            .collect()
    }

    fn value<'a>(fields: &'a [FieldValue], name: &str) -> Option<&'a str> {
        fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    #[test_case(ReservationVariant::Short, 1, "60" ; "short single")]
    #[test_case(ReservationVariant::Short, 4, "60" ; "short foursome")]
    #[test_case(ReservationVariant::Long, 2, "90" ; "long pair")]
    #[test_case(ReservationVariant::Long, 3, "90" ; "long three")]
    fn builtin_resolves_duration(variant: ReservationVariant, size: usize, duration: &str) {
        let config = SlotTable::builtin().resolve(variant, &party(size)).unwrap();
        assert_eq!(value(&config.fields, "duration"), Some(duration));
        assert_eq!(value(&config.fields, "players"), Some(size.to_string().as_str()));
        assert_eq!(config.selections.len(), 2);
        assert_eq!(config.selections[0].control, "duration");
    }

    #[test]
    fn party_type_is_fixed_for_every_row() {
        let table = SlotTable::builtin();
        for variant in [ReservationVariant::Short, ReservationVariant::Long] {
            for size in 1..=MAX_PARTY_SIZE {
                let config = table.resolve(variant, &party(size)).unwrap();
                assert_eq!(value(&config.fields, PARTY_TYPE_FIELD), Some(PARTY_TYPE_VALUE));
            }
        }
    }

    #[test]
    fn unknown_party_size_is_an_error() {
        let err = SlotTable::builtin()
            .resolve(ReservationVariant::Short, &party(5))
            .unwrap_err();
        assert_eq!(
            err,
            SlotError::UnknownCombination {
                variant: ReservationVariant::Short,
                party_size: 5
            }
        );
    }

    #[test]
    fn empty_party_is_an_error() {
        assert_eq!(
            SlotTable::builtin().resolve(ReservationVariant::Long, &[]),
            Err(SlotError::EmptyParty)
        );
    }

    #[test]
    fn sponsored_by_only_on_guests() {
        let fields = SlotTable::builtin().participant_fields(&party(3));

        assert_eq!(value(&fields, "participants[0][name]"), Some("P0"));
        assert_eq!(value(&fields, "participants[0][member_id]"), Some("1001"));
        assert_eq!(value(&fields, "participants[0][sponsored_by]"), None);
        assert_eq!(value(&fields, "participants[1][sponsored_by]"), Some("1001"));
        assert_eq!(value(&fields, "participants[2][sponsored_by]"), Some("1001"));
        assert_eq!(value(&fields, "participants[2][member_id]"), None);
    }

    #[test]
    fn sponsor_falls_back_to_primary_name() {
        let party = vec![
            Participant::new("Host", None),
            Participant::new("Guest", None),
        ];
        let fields = SlotTable::builtin().participant_fields(&party);
        assert_eq!(value(&fields, "participants[1][sponsored_by]"), Some("Host"));
    }

    #[test]
    fn table_deserializes_from_yaml_with_defaults() {
        let yaml = r"
rows:
  - variant: short
    party_size: 1
    fields:
      - { name: length, value: '60' }
    selections:
      - { control: length, value: '60' }
";
        let table: SlotTable = serde_yaml_bw::from_str(yaml).unwrap();
        assert_eq!(table.party_type_value, PARTY_TYPE_VALUE);
        let config = table
            .resolve(ReservationVariant::Short, &party(1))
            .unwrap();
        assert_eq!(value(&config.fields, "length"), Some("60"));
        assert!(table.resolve(ReservationVariant::Long, &party(1)).is_err());
    }
}

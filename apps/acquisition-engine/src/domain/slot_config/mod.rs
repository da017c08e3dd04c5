//! Slot Configuration Bounded Context

pub mod table;

pub use table::{
    ControlSelection, FieldValue, MAX_PARTY_SIZE, PARTY_TYPE_FIELD, PARTY_TYPE_VALUE,
    ParticipantLayout, SlotConfiguration, SlotError, SlotRow, SlotTable,
};

//! Application Ports (Driven)
//!
//! Interfaces to everything outside the engine: the remote booking service,
//! the upstream store, credential decryption and settle delays.

mod credential_port;
mod reservation_store_port;
mod session_port;
mod settle_port;
mod submitter_port;
mod time_probe_port;

pub use credential_port::{CredentialDecryptor, CredentialError};
pub use reservation_store_port::{
    OutcomeUpdate, RequestStatus, ReservationStore, StoreError, StoredRequest,
};
pub use session_port::{
    AcquisitionSession, Credentials, Interaction, ProofToken, SessionError, SessionFactory,
    SessionState, View,
};
pub use settle_port::{SettlePurpose, Settler};
pub use submitter_port::{ProtocolSubmitter, SubmitError};
pub use time_probe_port::{ProbeError, TimeProbe};

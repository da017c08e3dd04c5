//! Acquisition Session Port (Driven Port)
//!
//! One authenticated session against the remote booking service. Methods take
//! `&mut self`: a session serves one logical thread of control and never has
//! two loads in flight.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use super::settle_port::{SettlePurpose, Settler};
use crate::domain::reservation::DesiredSlot;
use crate::domain::shared::{HoldId, UnitId};

/// Plaintext credentials. Lives only for the duration of `authenticate`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Login name.
    pub username: String,
    /// Plaintext secret.
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A loaded candidate view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    /// Unit the view was loaded for.
    pub unit: UnitId,
    /// Final address after redirects.
    pub address: String,
    /// Raw markup.
    pub body: String,
    /// Local time the load completed.
    pub loaded_at: DateTime<Utc>,
}

/// One step on the interactive view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    /// Choose `value` in control `control`.
    Select {
        /// Control name.
        control: String,
        /// Option value.
        value: String,
    },
    /// Let the view settle.
    Settle(SettlePurpose),
}

/// Session identity captured at detach, passed explicitly to the submitter.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// `Cookie` header value.
    pub cookie_header: String,
    /// Origin the identity belongs to.
    pub origin: String,
    /// When the identity was captured.
    pub captured_at: DateTime<Utc>,
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("cookie_header", &"<redacted>")
            .field("origin", &self.origin)
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

/// Fresh single-use submission token.
#[derive(Clone, PartialEq, Eq)]
pub struct ProofToken(String);

impl ProofToken {
    /// Wrap a token value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Token value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ProofToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProofToken(<{} bytes>)", self.0.len())
    }
}

/// Session port error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Credentials rejected.
    #[error("login rejected: {0}")]
    Rejected(String),

    /// Network failure or unexpected status.
    #[error("transport error: {0}")]
    Transport(String),

    /// A bounded wait ran out.
    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// Another unit's hold is still open.
    #[error("hold on unit {held} still open; cannot load unit {requested}")]
    HoldOpen {
        /// Unit holding the slot.
        held: UnitId,
        /// Unit requested.
        requested: UnitId,
    },

    /// Session identity is gone.
    #[error("session identity lost: {0}")]
    IdentityLost(String),

    /// Remote replied with something the adapter cannot use.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Port for one acquisition session.
#[async_trait]
pub trait AcquisitionSession: Send {
    /// Log in.
    async fn authenticate(&mut self, credentials: &Credentials) -> Result<(), SessionError>;

    /// Load the candidate view of `unit` for the desired slot.
    async fn load_candidate(
        &mut self,
        unit: &UnitId,
        slot: &DesiredSlot,
    ) -> Result<View, SessionError>;

    /// Visible text of the view.
    async fn view_text(&mut self, view: &View) -> Result<String, SessionError>;

    /// Wait up to `timeout` for `field` to carry a value.
    async fn await_field(
        &mut self,
        view: &View,
        field: &str,
        timeout: Duration,
    ) -> Result<Option<String>, SessionError>;

    /// Values of hidden fields. Absent fields are left out.
    async fn read_hidden_state(
        &mut self,
        view: &View,
        fields: &[String],
    ) -> Result<HashMap<String, String>, SessionError>;

    /// Run `actions` in order, updating `view` with each response.
    async fn perform_interaction(
        &mut self,
        view: &mut View,
        actions: &[Interaction],
        settler: &dyn Settler,
    ) -> Result<(), SessionError>;

    /// Wait up to `timeout` for the token to become mintable.
    async fn await_token_ready(
        &mut self,
        view: &View,
        timeout: Duration,
    ) -> Result<(), SessionError>;

    /// Mint a fresh token bound to `hold`.
    async fn mint_token(&mut self, view: &View, hold: &HoldId)
    -> Result<ProofToken, SessionError>;

    /// Tear down the view, returning the session identity.
    async fn detach(&mut self, view: View) -> Result<SessionState, SessionError>;

    /// Re-seed the identity after a detached submission failed.
    async fn reattach(&mut self, state: &SessionState) -> Result<(), SessionError>;

    /// Release the hold of an abandoned unit.
    async fn release(&mut self, view: View) -> Result<(), SessionError>;

    /// Tear the session down, releasing any hold still open.
    ///
    /// Called on every exit path, including cancellation mid-attempt.
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Opens sessions. One session per execution.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Open a fresh, unauthenticated session.
    async fn open(&self) -> Result<Box<dyn AcquisitionSession>, SessionError>;
}

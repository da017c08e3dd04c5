//! Protocol Submitter Port (Driven Port)
//!
//! Raw form-encoded write issued after the interactive view is detached.

use async_trait::async_trait;

use super::session_port::SessionState;
use crate::domain::acquisition::{SubmissionForm, SubmissionResponse};

/// Submitter error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// Network failure.
    #[error("submission transport error: {0}")]
    Transport(String),

    /// Session identity was refused.
    #[error("session identity refused: {0}")]
    IdentityRefused(String),
}

/// Port for the final submission.
#[async_trait]
pub trait ProtocolSubmitter: Send + Sync {
    /// Post `form` using `state`, without following redirects.
    async fn submit(
        &self,
        state: &SessionState,
        form: &SubmissionForm,
    ) -> Result<SubmissionResponse, SubmitError>;
}

//! Remote booking service error types.

use reqwest::StatusCode;
use thiserror::Error;

use crate::application::ports::{ProbeError, SessionError, SubmitError};

/// Errors from the HTTP adapters.
#[derive(Debug, Error, Clone)]
pub enum RemoteError {
    /// Network failure or timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// Unexpected status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Status code.
        status: u16,
        /// Truncated body.
        body: String,
    },

    /// Session cookies rejected.
    #[error("Session identity rejected (HTTP {0})")]
    Unauthorized(u16),

    /// Reply could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid address built from configuration.
    #[error("Invalid URL: {0}")]
    Url(String),
}

impl RemoteError {
    /// Map a non-success status.
    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        match categorize_status(status) {
            StatusCategory::Unauthorized => Self::Unauthorized(status.as_u16()),
            StatusCategory::Other => Self::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            },
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<RemoteError> for SessionError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unauthorized(_) => Self::IdentityLost(err.to_string()),
            RemoteError::Parse(_) | RemoteError::Url(_) => Self::Protocol(err.to_string()),
            RemoteError::Network(_) | RemoteError::Status { .. } => Self::Transport(err.to_string()),
        }
    }
}

impl From<RemoteError> for SubmitError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unauthorized(_) => Self::IdentityRefused(err.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<RemoteError> for ProbeError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Parse(msg) => Self::NoServerTime(msg),
            other => Self::Transport(other.to_string()),
        }
    }
}

enum StatusCategory {
    Unauthorized,
    Other,
}

const fn categorize_status(status: StatusCode) -> StatusCategory {
    match status.as_u16() {
        401 | 403 | 419 | 440 => StatusCategory::Unauthorized,
        _ => StatusCategory::Other,
    }
}

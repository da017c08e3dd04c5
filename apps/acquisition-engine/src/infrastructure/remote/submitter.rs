//! Raw HTTP submitter.
//!
//! Redirects are not followed: the `Location` of the reply is the verdict.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, LOCATION};
use reqwest::{Client, StatusCode, redirect};

use super::error::RemoteError;
use crate::application::ports::{ProtocolSubmitter, SessionState, SubmitError};
use crate::config::RemoteConfig;
use crate::domain::acquisition::{SubmissionForm, SubmissionResponse};

/// Posts the reservation form with the detached session's cookies.
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    client: Client,
    url: String,
}

impl HttpSubmitter {
    /// Create a submitter for the configured submission endpoint.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            url: config.url(&config.submit_path),
        })
    }
}

#[async_trait]
impl ProtocolSubmitter for HttpSubmitter {
    async fn submit(
        &self,
        state: &SessionState,
        form: &SubmissionForm,
    ) -> Result<SubmissionResponse, SubmitError> {
        let response = self
            .client
            .post(&self.url)
            .header(COOKIE, &state.cookie_header)
            .form(form.fields())
            .send()
            .await
            .map_err(RemoteError::from)?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(RemoteError::Unauthorized(status.as_u16()).into());
        }

        let redirect = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        tracing::debug!(
            status = status.as_u16(),
            fields = form.len(),
            "Reservation form submitted"
        );

        Ok(SubmissionResponse {
            status: status.as_u16(),
            redirect,
        })
    }
}

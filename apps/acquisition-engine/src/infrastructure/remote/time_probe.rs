//! Remote time probe.
//!
//! Reads epoch milliseconds from a JSON field; falls back to the `Date`
//! header when the body has none.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::header::DATE;

use super::error::RemoteError;
use crate::application::ports::{ProbeError, TimeProbe};
use crate::config::RemoteConfig;

/// HTTP implementation of [`TimeProbe`].
#[derive(Debug, Clone)]
pub struct HttpTimeProbe {
    client: Client,
    url: String,
    field: String,
}

impl HttpTimeProbe {
    /// Create a probe for the configured time endpoint.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            url: config.url(&config.time_path),
            field: config.time_field.clone(),
        })
    }
}

#[async_trait]
impl TimeProbe for HttpTimeProbe {
    async fn server_time(&self) -> Result<DateTime<Utc>, ProbeError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(RemoteError::from)?;

        let status = response.status();
        let date_header = response
            .headers()
            .get(DATE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(RemoteError::from)?;

        if status.is_success()
            && let Ok(json) = serde_json::from_str::<serde_json::Value>(&body)
            && let Some(ms) = json.get(&self.field).and_then(serde_json::Value::as_i64)
            && let Some(time) = DateTime::from_timestamp_millis(ms)
        {
            return Ok(time);
        }

        if let Some(date) = date_header
            && let Ok(time) = DateTime::parse_from_rfc2822(&date)
        {
            return Ok(time.with_timezone(&Utc));
        }

        Err(RemoteError::Parse(format!(
            "HTTP {status} with neither '{}' nor a Date header",
            self.field
        ))
        .into())
    }
}

//! HTTP acquisition session.
//!
//! One cookie jar per session. The jar is the session identity: detach
//! serializes it into a `Cookie` header for the raw submission, reattach
//! seeds it back.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Response, StatusCode, Url};
use tokio::time::Instant;

use super::error::RemoteError;
use super::markup;
use crate::application::ports::{
    AcquisitionSession, Credentials, Interaction, ProofToken, SessionError, SessionFactory,
    SessionState, Settler, View,
};
use crate::config::RemoteConfig;
use crate::domain::reservation::DesiredSlot;
use crate::domain::shared::{HoldId, UnitId};

/// Delay between re-reads while waiting for a field or the token endpoint.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Opens [`HttpSession`]s against the configured service.
#[derive(Debug, Clone)]
pub struct HttpSessionFactory {
    config: Arc<RemoteConfig>,
}

impl HttpSessionFactory {
    /// Create a factory.
    #[must_use]
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

#[async_trait]
impl SessionFactory for HttpSessionFactory {
    async fn open(&self) -> Result<Box<dyn AcquisitionSession>, SessionError> {
        let session = HttpSession::new(Arc::clone(&self.config))?;
        Ok(Box::new(session))
    }
}

/// Session against the remote booking service over HTTP.
pub struct HttpSession {
    client: Client,
    jar: Arc<Jar>,
    config: Arc<RemoteConfig>,
    origin: Url,
    open_hold: Option<(UnitId, HoldId)>,
    refreshed: Option<(String, String)>,
}

impl HttpSession {
    /// Create a session with an empty cookie jar.
    pub fn new(config: Arc<RemoteConfig>) -> Result<Self, RemoteError> {
        let origin =
            Url::parse(&config.base_url).map_err(|e| RemoteError::Url(format!("{}: {e}", config.base_url)))?;
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            jar,
            config,
            origin,
            open_hold: None,
            refreshed: None,
        })
    }

    /// Unit whose hold this session currently has open.
    #[must_use]
    pub fn open_hold(&self) -> Option<&UnitId> {
        self.open_hold.as_ref().map(|(unit, _)| unit)
    }

    fn candidate_url(&self, unit: &UnitId, slot: &DesiredSlot) -> String {
        let path = self
            .config
            .candidate_path
            .replace("{unit}", unit.as_str())
            .replace("{date}", &slot.date.format("%Y-%m-%d").to_string())
            .replace("{time}", &slot.time.format("%H:%M").to_string());
        self.config.url(&path)
    }

    /// Latest markup known for the view's address.
    fn markup_for<'a>(&'a self, view: &'a View) -> &'a str {
        match &self.refreshed {
            Some((address, body)) if *address == view.address => body,
            _ => &view.body,
        }
    }

    fn cookie_header(&self) -> Option<String> {
        self.jar
            .cookies(&self.origin)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    async fn get(&self, url: &str) -> Result<(String, String), RemoteError> {
        let response = self.client.get(url).send().await?;
        read_page(response).await
    }

    /// Give `hold` back to the service. No-op without a release endpoint.
    async fn post_release(&self, hold: &HoldId) -> Result<(), RemoteError> {
        let Some(path) = &self.config.release_path else {
            return Ok(());
        };

        let url = self.config.url(path);
        let form = [(self.config.hold_field.as_str(), hold.as_str())];
        let response = self.client.post(&url).form(&form).send().await?;
        read_page(response).await?;
        Ok(())
    }
}

/// Final address and body of a successful page load.
async fn read_page(response: Response) -> Result<(String, String), RemoteError> {
    let status = response.status();
    let address = response.url().to_string();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(RemoteError::from_status(status, &body));
    }
    Ok((address, body))
}

#[async_trait]
impl AcquisitionSession for HttpSession {
    async fn authenticate(&mut self, credentials: &Credentials) -> Result<(), SessionError> {
        let url = self.config.url(&self.config.login_path);
        let form = [
            (self.config.username_field.as_str(), credentials.username.as_str()),
            (self.config.password_field.as_str(), credentials.secret.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(RemoteError::from)?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(SessionError::Rejected(format!("HTTP {status}")));
        }
        read_page(response).await?;

        if self.cookie_header().is_none() {
            return Err(SessionError::Rejected(
                "no session cookie issued".to_string(),
            ));
        }

        tracing::debug!(username = %credentials.username, "Login accepted");
        Ok(())
    }

    async fn load_candidate(
        &mut self,
        unit: &UnitId,
        slot: &DesiredSlot,
    ) -> Result<View, SessionError> {
        if let Some((held, _)) = &self.open_hold
            && held != unit
        {
            return Err(SessionError::HoldOpen {
                held: held.clone(),
                requested: unit.clone(),
            });
        }

        let url = self.candidate_url(unit, slot);
        let (address, body) = self.get(&url).await?;
        self.refreshed = None;

        if let Some(hold) = markup::hidden_fields(&body)
            .remove(&self.config.hold_field)
            .filter(|value| !value.trim().is_empty())
        {
            self.open_hold = Some((unit.clone(), HoldId::new(hold)));
        }

        tracing::debug!(unit = %unit, address = %address, bytes = body.len(), "Candidate loaded");
        Ok(View {
            unit: unit.clone(),
            address,
            body,
            loaded_at: Utc::now(),
        })
    }

    async fn view_text(&mut self, view: &View) -> Result<String, SessionError> {
        Ok(markup::visible_text(self.markup_for(view)))
    }

    async fn await_field(
        &mut self,
        view: &View,
        field: &str,
        timeout: Duration,
    ) -> Result<Option<String>, SessionError> {
        let deadline = Instant::now() + timeout;

        loop {
            let found = markup::hidden_fields(self.markup_for(view))
                .remove(field)
                .filter(|value| !value.trim().is_empty());
            if let Some(value) = found {
                if field == self.config.hold_field {
                    self.open_hold = Some((view.unit.clone(), HoldId::new(value.as_str())));
                }
                return Ok(Some(value));
            }

            if Instant::now() + POLL_INTERVAL >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;

            let (address, body) = self.get(&view.address).await?;
            if address == view.address {
                self.refreshed = Some((address, body));
            }
        }
    }

    async fn read_hidden_state(
        &mut self,
        view: &View,
        fields: &[String],
    ) -> Result<HashMap<String, String>, SessionError> {
        let mut hidden = markup::hidden_fields(self.markup_for(view));
        hidden.retain(|name, _| fields.contains(name));
        Ok(hidden)
    }

    async fn perform_interaction(
        &mut self,
        view: &mut View,
        actions: &[Interaction],
        settler: &dyn Settler,
    ) -> Result<(), SessionError> {
        for action in actions {
            match action {
                Interaction::Select { control, value } => {
                    let mut form: Vec<(String, String)> =
                        markup::hidden_fields(self.markup_for(view))
                            .into_iter()
                            .filter(|(name, _)| name != control)
                            .collect();
                    form.sort();
                    form.push((control.clone(), value.clone()));

                    let response = self
                        .client
                        .post(&view.address)
                        .form(&form)
                        .send()
                        .await
                        .map_err(RemoteError::from)?;
                    let (address, body) = read_page(response).await?;

                    tracing::debug!(unit = %view.unit, control = %control, value = %value, "Selected");
                    view.address = address;
                    view.body = body;
                    view.loaded_at = Utc::now();
                    self.refreshed = None;
                }
                Interaction::Settle(purpose) => settler.settle(*purpose).await,
            }
        }
        Ok(())
    }

    async fn await_token_ready(
        &mut self,
        view: &View,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        let url = self.config.url(&self.config.token_path);
        let deadline = Instant::now() + timeout;

        loop {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(RemoteError::from)?;
            let status = response.status();

            if status.is_success() {
                return Ok(());
            }
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                return Err(RemoteError::Unauthorized(status.as_u16()).into());
            }

            if Instant::now() + POLL_INTERVAL >= deadline {
                return Err(SessionError::Timeout(format!(
                    "token readiness on unit {} (last HTTP {status})",
                    view.unit
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn mint_token(
        &mut self,
        view: &View,
        hold: &HoldId,
    ) -> Result<ProofToken, SessionError> {
        let url = self.config.url(&self.config.token_path);
        let form = [(self.config.hold_field.as_str(), hold.as_str())];

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(RemoteError::from)?;
        let (_, body) = read_page(response).await?;

        let reply: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| RemoteError::Parse(e.to_string()))?;
        let token = reply
            .get(&self.config.token_field)
            .and_then(serde_json::Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                RemoteError::Parse(format!(
                    "token reply for unit {} has no '{}'",
                    view.unit, self.config.token_field
                ))
            })?;

        Ok(ProofToken::new(token))
    }

    async fn detach(&mut self, view: View) -> Result<SessionState, SessionError> {
        self.open_hold = None;
        self.refreshed = None;

        let cookie_header = self.cookie_header().ok_or_else(|| {
            SessionError::IdentityLost(format!("no session cookies after unit {}", view.unit))
        })?;

        Ok(SessionState {
            cookie_header,
            origin: self.origin.origin().ascii_serialization(),
            captured_at: Utc::now(),
        })
    }

    async fn reattach(&mut self, state: &SessionState) -> Result<(), SessionError> {
        let origin = self.origin.origin().ascii_serialization();
        if state.origin != origin {
            return Err(SessionError::Protocol(format!(
                "session state from {} cannot attach to {origin}",
                state.origin
            )));
        }

        for pair in state.cookie_header.split(';').map(str::trim) {
            if !pair.is_empty() {
                self.jar.add_cookie_str(pair, &self.origin);
            }
        }
        Ok(())
    }

    async fn release(&mut self, view: View) -> Result<(), SessionError> {
        let visible = markup::hidden_fields(self.markup_for(&view))
            .remove(&self.config.hold_field)
            .filter(|value| !value.trim().is_empty())
            .map(HoldId::new);
        let tracked = self.open_hold.take().map(|(_, hold)| hold);
        self.refreshed = None;

        let Some(hold) = visible.or(tracked) else {
            return Ok(());
        };
        self.post_release(&hold).await?;

        tracing::debug!(unit = %view.unit, hold = %hold, "Hold released");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.refreshed = None;

        if let Some((unit, hold)) = self.open_hold.take() {
            match self.post_release(&hold).await {
                Ok(()) => tracing::debug!(unit = %unit, hold = %hold, "Hold released on close"),
                Err(e) => tracing::warn!(
                    unit = %unit,
                    hold = %hold,
                    error = %e,
                    "Hold release on close failed"
                ),
            }
        }

        tracing::debug!("Session closed");
        Ok(())
    }
}

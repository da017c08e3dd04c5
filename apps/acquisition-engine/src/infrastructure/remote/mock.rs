//! Scripted remote service for testing.
//!
//! Every session opened by a [`ScriptedSessionFactory`] shares one script and
//! one event log, so tests can assert on the exact sequence of remote calls
//! after an execution finishes.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::application::ports::{
    AcquisitionSession, Credentials, Interaction, ProbeError, ProofToken, ProtocolSubmitter,
    SessionError, SessionFactory, SessionState, SettlePurpose, Settler, SubmitError, TimeProbe,
    View,
};
use crate::domain::acquisition::{SubmissionForm, SubmissionResponse};
use crate::domain::reservation::DesiredSlot;
use crate::domain::shared::{HoldId, UnitId};

const ORIGIN: &str = "https://scripted.invalid";

/// What one candidate load returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedLoad {
    /// Interactive view carrying a hold.
    Ready {
        /// Hold id exposed in hidden state.
        hold: String,
    },
    /// Failure view with the given visible text.
    Failure {
        /// Visible text.
        text: String,
    },
    /// Interactive view whose hold field never appears.
    Slow,
    /// The hold is visible while loading but gone from the hidden state.
    HoldVanishes {
        /// Hold id reported while waiting.
        hold: String,
    },
    /// The load itself fails.
    Error(SessionError),
}

impl ScriptedLoad {
    /// Ready view with `hold`.
    #[must_use]
    pub fn ready(hold: &str) -> Self {
        Self::Ready {
            hold: hold.to_string(),
        }
    }

    /// Failure view with `text`.
    #[must_use]
    pub fn failure(text: &str) -> Self {
        Self::Failure {
            text: text.to_string(),
        }
    }

    /// The "come back later" page shown before the window opens.
    #[must_use]
    pub fn too_early() -> Self {
        Self::failure("Please wait. Reservations open in 5 minutes.")
    }

    /// The "another member is booking" page.
    #[must_use]
    pub fn held_by_other() -> Self {
        Self::failure("This court is in progress by another member.")
    }
}

/// One remote call observed by a scripted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session was opened.
    Open,
    /// Login.
    Authenticate {
        /// Username presented.
        username: String,
    },
    /// Candidate load.
    Load {
        /// Unit requested.
        unit: UnitId,
        /// When the load was issued.
        at: DateTime<Utc>,
    },
    /// Control selection.
    Select {
        /// Control name.
        control: String,
        /// Value chosen.
        value: String,
    },
    /// Settle delay.
    Settle(SettlePurpose),
    /// Token readiness wait.
    AwaitToken,
    /// Token minted for a hold.
    Mint {
        /// Hold the token is bound to.
        hold: HoldId,
    },
    /// View detached for submission.
    Detach {
        /// Unit of the detached view.
        unit: UnitId,
    },
    /// Identity restored after a failed submission.
    Reattach,
    /// Hold released.
    Release {
        /// Unit released.
        unit: UnitId,
    },
    /// Session closed.
    Close,
}

#[derive(Debug)]
struct Script {
    loads: HashMap<UnitId, VecDeque<ScriptedLoad>>,
    login_rejection: Option<String>,
    token_failure: Option<SessionError>,
    reattach_failure: Option<SessionError>,
    load_delay: Option<Duration>,
    token_delay: Option<Duration>,
    hold_field: String,
    identity: Vec<(String, String)>,
    events: Vec<SessionEvent>,
}

impl Script {
    /// Next load for `unit`; the last scripted entry repeats.
    fn next_load(&mut self, unit: &UnitId) -> ScriptedLoad {
        let Some(queue) = self.loads.get_mut(unit) else {
            return ScriptedLoad::failure("Something went wrong. Please try again.");
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap_or(ScriptedLoad::Slow)
        } else {
            queue.front().cloned().unwrap_or(ScriptedLoad::Slow)
        }
    }
}

/// Opens [`ScriptedSession`]s sharing one script.
#[derive(Debug, Clone)]
pub struct ScriptedSessionFactory {
    script: Arc<Mutex<Script>>,
}

impl Default for ScriptedSessionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSessionFactory {
    /// Create a factory with the default `hold_id` field and one identity
    /// field `member_ref`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                loads: HashMap::new(),
                login_rejection: None,
                token_failure: None,
                reattach_failure: None,
                load_delay: None,
                token_delay: None,
                hold_field: "hold_id".to_string(),
                identity: vec![("member_ref".to_string(), "M-1001".to_string())],
                events: Vec::new(),
            })),
        }
    }

    /// Script the loads of `unit`, in order. The last one repeats.
    pub fn script_unit(&self, unit: &str, loads: impl IntoIterator<Item = ScriptedLoad>) {
        self.script
            .lock()
            .loads
            .insert(UnitId::new(unit), loads.into_iter().collect());
    }

    /// Reject every login with `message`.
    pub fn reject_login(&self, message: &str) {
        self.script.lock().login_rejection = Some(message.to_string());
    }

    /// Fail every token readiness wait with `error`.
    pub fn fail_token(&self, error: SessionError) {
        self.script.lock().token_failure = Some(error);
    }

    /// Fail every reattach with `error`.
    pub fn fail_reattach(&self, error: SessionError) {
        self.script.lock().reattach_failure = Some(error);
    }

    /// Delay every candidate load.
    pub fn delay_loads(&self, delay: Duration) {
        self.script.lock().load_delay = Some(delay);
    }

    /// Delay every token readiness wait.
    pub fn delay_token(&self, delay: Duration) {
        self.script.lock().token_delay = Some(delay);
    }

    /// Every event so far.
    #[must_use]
    pub fn events(&self) -> Vec<SessionEvent> {
        self.script.lock().events.clone()
    }

    /// Units loaded, in order, one entry per load.
    #[must_use]
    pub fn loads(&self) -> Vec<UnitId> {
        self.script
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Load { unit, .. } => Some(unit.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of loads of `unit`.
    #[must_use]
    pub fn load_count(&self, unit: &str) -> usize {
        self.loads().iter().filter(|u| u.as_str() == unit).count()
    }

    /// Number of times `event` was observed.
    #[must_use]
    pub fn count(&self, event: &SessionEvent) -> usize {
        self.script
            .lock()
            .events
            .iter()
            .filter(|e| *e == event)
            .count()
    }
}

#[async_trait]
impl SessionFactory for ScriptedSessionFactory {
    async fn open(&self) -> Result<Box<dyn AcquisitionSession>, SessionError> {
        self.script.lock().events.push(SessionEvent::Open);
        Ok(Box::new(ScriptedSession {
            script: Arc::clone(&self.script),
            current: None,
            open_hold: None,
        }))
    }
}

/// Session replaying a [`ScriptedSessionFactory`] script.
///
/// Enforces the single-hold rule the same way the HTTP session does.
#[derive(Debug)]
pub struct ScriptedSession {
    script: Arc<Mutex<Script>>,
    current: Option<ScriptedLoad>,
    open_hold: Option<UnitId>,
}

impl ScriptedSession {
    fn record(&self, event: SessionEvent) {
        self.script.lock().events.push(event);
    }
}

#[async_trait]
impl AcquisitionSession for ScriptedSession {
    async fn authenticate(&mut self, credentials: &Credentials) -> Result<(), SessionError> {
        let mut script = self.script.lock();
        script.events.push(SessionEvent::Authenticate {
            username: credentials.username.clone(),
        });
        match &script.login_rejection {
            Some(message) => Err(SessionError::Rejected(message.clone())),
            None => Ok(()),
        }
    }

    async fn load_candidate(
        &mut self,
        unit: &UnitId,
        slot: &DesiredSlot,
    ) -> Result<View, SessionError> {
        if let Some(held) = &self.open_hold
            && held != unit
        {
            return Err(SessionError::HoldOpen {
                held: held.clone(),
                requested: unit.clone(),
            });
        }

        let delay = self.script.lock().load_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let load = {
            let mut script = self.script.lock();
            script.events.push(SessionEvent::Load {
                unit: unit.clone(),
                at: Utc::now(),
            });
            script.next_load(unit)
        };

        let reserve = format!("{ORIGIN}/reserve/{unit}/{}/{}", slot.date, slot.time);
        let (address, body) = match &load {
            ScriptedLoad::Error(e) => return Err(e.clone()),
            ScriptedLoad::Failure { text } => (format!("{ORIGIN}/error"), text.clone()),
            ScriptedLoad::Ready { .. } | ScriptedLoad::Slow | ScriptedLoad::HoldVanishes { .. } => {
                (reserve, "Reserve".to_string())
            }
        };

        if matches!(load, ScriptedLoad::Ready { .. }) {
            self.open_hold = Some(unit.clone());
        }
        self.current = Some(load);

        Ok(View {
            unit: unit.clone(),
            address,
            body,
            loaded_at: Utc::now(),
        })
    }

    async fn view_text(&mut self, view: &View) -> Result<String, SessionError> {
        Ok(view.body.clone())
    }

    async fn await_field(
        &mut self,
        _view: &View,
        field: &str,
        _timeout: Duration,
    ) -> Result<Option<String>, SessionError> {
        if field != self.script.lock().hold_field {
            return Ok(None);
        }
        Ok(match &self.current {
            Some(ScriptedLoad::Ready { hold } | ScriptedLoad::HoldVanishes { hold }) => {
                Some(hold.clone())
            }
            _ => None,
        })
    }

    async fn read_hidden_state(
        &mut self,
        _view: &View,
        fields: &[String],
    ) -> Result<HashMap<String, String>, SessionError> {
        let script = self.script.lock();
        let mut hidden: HashMap<String, String> = script.identity.iter().cloned().collect();
        if let Some(ScriptedLoad::Ready { hold }) = &self.current {
            hidden.insert(script.hold_field.clone(), hold.clone());
        }
        hidden.retain(|name, _| fields.contains(name));
        Ok(hidden)
    }

    async fn perform_interaction(
        &mut self,
        _view: &mut View,
        actions: &[Interaction],
        settler: &dyn Settler,
    ) -> Result<(), SessionError> {
        for action in actions {
            match action {
                Interaction::Select { control, value } => self.record(SessionEvent::Select {
                    control: control.clone(),
                    value: value.clone(),
                }),
                Interaction::Settle(purpose) => {
                    self.record(SessionEvent::Settle(*purpose));
                    settler.settle(*purpose).await;
                }
            }
        }
        Ok(())
    }

    async fn await_token_ready(
        &mut self,
        _view: &View,
        _timeout: Duration,
    ) -> Result<(), SessionError> {
        let delay = self.script.lock().token_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut script = self.script.lock();
        script.events.push(SessionEvent::AwaitToken);
        match &script.token_failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn mint_token(
        &mut self,
        _view: &View,
        hold: &HoldId,
    ) -> Result<ProofToken, SessionError> {
        self.record(SessionEvent::Mint { hold: hold.clone() });
        Ok(ProofToken::new(format!("tok-{hold}")))
    }

    async fn detach(&mut self, view: View) -> Result<SessionState, SessionError> {
        self.record(SessionEvent::Detach {
            unit: view.unit.clone(),
        });
        self.open_hold = None;
        self.current = None;
        Ok(SessionState {
            cookie_header: "sid=scripted".to_string(),
            origin: ORIGIN.to_string(),
            captured_at: Utc::now(),
        })
    }

    async fn reattach(&mut self, _state: &SessionState) -> Result<(), SessionError> {
        let mut script = self.script.lock();
        script.events.push(SessionEvent::Reattach);
        match &script.reattach_failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn release(&mut self, view: View) -> Result<(), SessionError> {
        self.record(SessionEvent::Release { unit: view.unit });
        self.open_hold = None;
        self.current = None;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if let Some(unit) = self.open_hold.take() {
            self.record(SessionEvent::Release { unit });
        }
        self.record(SessionEvent::Close);
        self.current = None;
        Ok(())
    }
}

/// Submitter replaying queued replies and recording every form.
#[derive(Debug, Default)]
pub struct ScriptedSubmitter {
    replies: Mutex<VecDeque<Result<SubmissionResponse, SubmitError>>>,
    forms: Mutex<Vec<SubmissionForm>>,
}

impl ScriptedSubmitter {
    /// Create a submitter with no queued replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a redirect to the confirmation page for `id`.
    pub fn confirm(&self, id: &str) {
        self.redirect(&format!("/confirmation/{id}"));
    }

    /// Queue a redirect to `location`.
    pub fn redirect(&self, location: &str) {
        self.replies.lock().push_back(Ok(SubmissionResponse {
            status: 303,
            redirect: Some(location.to_string()),
        }));
    }

    /// Queue a failure.
    pub fn fail(&self, error: SubmitError) {
        self.replies.lock().push_back(Err(error));
    }

    /// Every submitted form.
    #[must_use]
    pub fn forms(&self) -> Vec<SubmissionForm> {
        self.forms.lock().clone()
    }
}

#[async_trait]
impl ProtocolSubmitter for ScriptedSubmitter {
    async fn submit(
        &self,
        _state: &SessionState,
        form: &SubmissionForm,
    ) -> Result<SubmissionResponse, SubmitError> {
        self.forms.lock().push(form.clone());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(SubmitError::Transport("no scripted reply".to_string())))
    }
}

/// Time probe reporting the local clock shifted by a fixed offset.
#[derive(Debug, Clone)]
pub struct FixedOffsetProbe {
    offset: Option<chrono::Duration>,
}

impl FixedOffsetProbe {
    /// Server clock `offset_ms` ahead of the local one.
    #[must_use]
    pub const fn new(offset_ms: i64) -> Self {
        Self {
            offset: Some(chrono::Duration::milliseconds(offset_ms)),
        }
    }

    /// Probe whose every call fails.
    #[must_use]
    pub const fn unreachable() -> Self {
        Self { offset: None }
    }
}

#[async_trait]
impl TimeProbe for FixedOffsetProbe {
    async fn server_time(&self) -> Result<DateTime<Utc>, ProbeError> {
        match self.offset {
            Some(offset) => Ok(Utc::now() + offset),
            None => Err(ProbeError::Transport("probe unreachable".to_string())),
        }
    }
}

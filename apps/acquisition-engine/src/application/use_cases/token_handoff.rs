//! Token & Hold Extraction + Protocol Submission
//!
//! Runs once a view is `Ready`: configures the view, reads the hold, mints the
//! token last, detaches, and issues the raw write.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::application::ports::{
    AcquisitionSession, Interaction, ProtocolSubmitter, SessionError, SessionState, SettlePurpose,
    Settler, SubmitError, View,
};
use crate::domain::acquisition::{AbandonReason, RedirectRules, SubmissionForm, SubmissionVerdict};
use crate::domain::shared::{ConfirmationId, HoldId};
use crate::domain::slot_config::SlotConfiguration;
use crate::error::AcquisitionError;
use crate::observability::record_submit_latency;

/// Field names the handoff reads and writes.
#[derive(Debug, Clone)]
pub struct HandoffFields {
    /// Hidden field carrying the hold id.
    pub hold_field: String,
    /// Hidden identity fields copied into the submission.
    pub identity_fields: Vec<String>,
    /// Form field carrying the token.
    pub token_field: String,
    /// Bounded wait for token readiness.
    pub token_timeout: Duration,
}

/// Unit-scoped handoff failure.
#[derive(Debug)]
pub struct UnitFailure {
    /// Why the unit is abandoned.
    pub reason: AbandonReason,
    /// The view, if still attached (release it).
    pub view: Option<View>,
    /// The identity, if already detached (reattach before the next unit).
    pub detached: Option<SessionState>,
}

/// Handoff failure.
#[derive(Debug)]
pub enum HandoffError {
    /// Abandon the unit, keep going.
    Unit(UnitFailure),
    /// Abort the execution.
    Session(AcquisitionError),
}

impl HandoffError {
    fn attached(view: View, reason: AbandonReason) -> Self {
        Self::Unit(UnitFailure {
            reason,
            view: Some(view),
            detached: None,
        })
    }

    fn detached(state: SessionState, reason: AbandonReason) -> Self {
        Self::Unit(UnitFailure {
            reason,
            view: None,
            detached: Some(state),
        })
    }
}

/// Drives a ready view through to a confirmed (or rejected) submission.
pub struct TokenHandoff<S: ProtocolSubmitter> {
    submitter: Arc<S>,
    settler: Arc<dyn Settler>,
    redirects: RedirectRules,
    fields: HandoffFields,
}

impl<S: ProtocolSubmitter> TokenHandoff<S> {
    /// Create a handoff.
    pub fn new(
        submitter: Arc<S>,
        settler: Arc<dyn Settler>,
        redirects: RedirectRules,
        fields: HandoffFields,
    ) -> Self {
        Self {
            submitter,
            settler,
            redirects,
            fields,
        }
    }

    /// Configure, extract, mint, detach, submit, interpret.
    pub async fn run(
        &self,
        session: &mut dyn AcquisitionSession,
        mut view: View,
        slot: &SlotConfiguration,
    ) -> Result<ConfirmationId, HandoffError> {
        let actions: Vec<Interaction> = slot
            .selections
            .iter()
            .flat_map(|s| {
                [
                    Interaction::Select {
                        control: s.control.clone(),
                        value: s.value.clone(),
                    },
                    Interaction::Settle(SettlePurpose::AfterSelection),
                ]
            })
            .collect();

        if let Err(e) = session
            .perform_interaction(&mut view, &actions, self.settler.as_ref())
            .await
        {
            return Err(on_session_error(view, e, transport));
        }

        let mut wanted = Vec::with_capacity(1 + self.fields.identity_fields.len());
        wanted.push(self.fields.hold_field.clone());
        wanted.extend(self.fields.identity_fields.iter().cloned());

        let hidden = match session.read_hidden_state(&view, &wanted).await {
            Ok(hidden) => hidden,
            Err(e) => return Err(on_session_error(view, e, transport)),
        };

        let Some(hold) = hidden
            .get(&self.fields.hold_field)
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .map(HoldId::new)
        else {
            return Err(HandoffError::attached(view, AbandonReason::HoldMissing));
        };

        // The token is minted last; it is single-use and short-lived.
        self.settler.settle(SettlePurpose::BeforeToken).await;
        if let Err(e) = session
            .await_token_ready(&view, self.fields.token_timeout)
            .await
        {
            return Err(on_session_error(view, e, token_unavailable));
        }
        let token = match session.mint_token(&view, &hold).await {
            Ok(token) => token,
            Err(e) => return Err(on_session_error(view, e, token_unavailable)),
        };

        let unit = view.unit.clone();
        let state = session.detach(view).await.map_err(|e| {
            HandoffError::Session(AcquisitionError::SessionLost(format!(
                "detach from unit {unit} failed: {e}"
            )))
        })?;

        let mut form = SubmissionForm::new();
        form.extend(slot.fields.iter().map(|f| (f.name.clone(), f.value.clone())));
        form.push(self.fields.hold_field.clone(), hold.as_str());
        for name in &self.fields.identity_fields {
            if let Some(value) = hidden.get(name) {
                form.push(name.clone(), value.clone());
            }
        }
        form.extend(
            slot.participant_fields
                .iter()
                .map(|f| (f.name.clone(), f.value.clone())),
        );
        form.push(self.fields.token_field.clone(), token.as_str());

        let started = Instant::now();
        let response = self.submitter.submit(&state, &form).await;
        record_submit_latency(started.elapsed().as_secs_f64());

        let response = match response {
            Ok(response) => response,
            Err(SubmitError::IdentityRefused(detail)) => {
                return Err(HandoffError::Session(AcquisitionError::SessionLost(
                    format!("submission for unit {unit} refused the session: {detail}"),
                )));
            }
            Err(e @ SubmitError::Transport(_)) => {
                return Err(HandoffError::detached(
                    state,
                    AbandonReason::SubmissionRejected {
                        detail: e.to_string(),
                    },
                ));
            }
        };

        tracing::debug!(
            unit = %unit,
            status = response.status,
            redirect = response.redirect.as_deref().unwrap_or("-"),
            "Submission answered"
        );

        match self.redirects.interpret(&response) {
            SubmissionVerdict::Confirmed(id) => Ok(id),
            SubmissionVerdict::Rejected(detail) => Err(HandoffError::detached(
                state,
                AbandonReason::SubmissionRejected { detail },
            )),
        }
    }
}

fn transport(e: &SessionError) -> AbandonReason {
    AbandonReason::Transport {
        detail: e.to_string(),
    }
}

fn token_unavailable(e: &SessionError) -> AbandonReason {
    AbandonReason::TokenUnavailable {
        detail: e.to_string(),
    }
}

/// Identity loss aborts the execution; anything else abandons the unit.
fn on_session_error(
    view: View,
    error: SessionError,
    reason: fn(&SessionError) -> AbandonReason,
) -> HandoffError {
    match error {
        SessionError::IdentityLost(detail) => {
            HandoffError::Session(AcquisitionError::SessionLost(detail))
        }
        other => HandoffError::attached(view, reason(&other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::SessionFactory;
    use crate::application::services::InstantSettler;
    use crate::domain::reservation::fixtures;
    use crate::domain::shared::UnitId;
    use crate::domain::slot_config::SlotTable;
    use crate::infrastructure::remote::{
        ScriptedLoad, ScriptedSessionFactory, ScriptedSubmitter, SessionEvent,
    };

    fn fields() -> HandoffFields {
        HandoffFields {
            hold_field: "hold_id".into(),
            identity_fields: vec!["member_ref".into()],
            token_field: "token".into(),
            token_timeout: Duration::from_millis(100),
        }
    }

    fn handoff(submitter: &Arc<ScriptedSubmitter>) -> TokenHandoff<ScriptedSubmitter> {
        TokenHandoff::new(
            Arc::clone(submitter),
            Arc::new(InstantSettler),
            RedirectRules::defaults().unwrap(),
            fields(),
        )
    }

    async fn run(
        factory: &ScriptedSessionFactory,
        submitter: &Arc<ScriptedSubmitter>,
    ) -> Result<ConfirmationId, HandoffError> {
        let request = fixtures::request(&["1"]);
        let slot = SlotTable::builtin()
            .resolve(request.variant, &request.party)
            .unwrap();
        let mut session = factory.open().await.unwrap();
        let view = session
            .load_candidate(&UnitId::new("1"), &request.desired_slot())
            .await
            .unwrap();
        handoff(submitter).run(session.as_mut(), view, &slot).await
    }

    #[tokio::test]
    async fn ready_view_is_submitted_in_field_order() {
        let factory = ScriptedSessionFactory::new();
        factory.script_unit("1", [ScriptedLoad::ready("H-1")]);
        let submitter = Arc::new(ScriptedSubmitter::new());
        submitter.confirm("278890");

        let confirmation = run(&factory, &submitter).await.unwrap();
        assert_eq!(confirmation, ConfirmationId::new("278890"));

        let forms = submitter.forms();
        let names: Vec<&str> = forms[0].fields().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "duration",
                "players",
                "party_type",
                "hold_id",
                "member_ref",
                "participants[0][name]",
                "participants[0][member_id]",
                "token",
            ]
        );
        assert_eq!(forms[0].get("token"), Some("tok-H-1"));
    }

    #[tokio::test]
    async fn token_is_minted_after_selections_and_before_detach() {
        let factory = ScriptedSessionFactory::new();
        factory.script_unit("1", [ScriptedLoad::ready("H-1")]);
        let submitter = Arc::new(ScriptedSubmitter::new());
        submitter.confirm("1");

        run(&factory, &submitter).await.unwrap();

        let events = factory.events();
        let position = |wanted: &SessionEvent| events.iter().position(|e| e == wanted).unwrap();
        let last_select = events
            .iter()
            .rposition(|e| matches!(e, SessionEvent::Select { .. }))
            .unwrap();
        let mint = position(&SessionEvent::Mint {
            hold: HoldId::new("H-1"),
        });
        let detach = position(&SessionEvent::Detach {
            unit: UnitId::new("1"),
        });
        assert!(last_select < mint);
        assert!(mint < detach);
    }

    #[tokio::test]
    async fn vanished_hold_abandons_unit_with_view() {
        let factory = ScriptedSessionFactory::new();
        factory.script_unit(
            "1",
            [ScriptedLoad::HoldVanishes {
                hold: "H-1".into(),
            }],
        );
        let submitter = Arc::new(ScriptedSubmitter::new());

        let Err(HandoffError::Unit(failure)) = run(&factory, &submitter).await else {
            panic!("expected unit failure");
        };
        assert_eq!(failure.reason, AbandonReason::HoldMissing);
        assert!(failure.view.is_some());
        assert!(submitter.forms().is_empty());
    }

    #[tokio::test]
    async fn token_timeout_abandons_unit() {
        let factory = ScriptedSessionFactory::new();
        factory.script_unit("1", [ScriptedLoad::ready("H-1")]);
        factory.fail_token(SessionError::Timeout("token readiness".into()));
        let submitter = Arc::new(ScriptedSubmitter::new());

        let Err(HandoffError::Unit(failure)) = run(&factory, &submitter).await else {
            panic!("expected unit failure");
        };
        assert!(matches!(failure.reason, AbandonReason::TokenUnavailable { .. }));
        assert!(failure.view.is_some());
    }

    #[tokio::test]
    async fn lost_identity_aborts_session() {
        let factory = ScriptedSessionFactory::new();
        factory.script_unit("1", [ScriptedLoad::ready("H-1")]);
        factory.fail_token(SessionError::IdentityLost("cookie expired".into()));
        let submitter = Arc::new(ScriptedSubmitter::new());

        let result = run(&factory, &submitter).await;
        assert!(matches!(
            result,
            Err(HandoffError::Session(AcquisitionError::SessionLost(_)))
        ));
    }

    #[tokio::test]
    async fn error_redirect_abandons_detached_unit() {
        let factory = ScriptedSessionFactory::new();
        factory.script_unit("1", [ScriptedLoad::ready("H-1")]);
        let submitter = Arc::new(ScriptedSubmitter::new());
        submitter.redirect("/error?code=slot_taken");

        let Err(HandoffError::Unit(failure)) = run(&factory, &submitter).await else {
            panic!("expected unit failure");
        };
        assert!(matches!(
            failure.reason,
            AbandonReason::SubmissionRejected { .. }
        ));
        assert!(failure.view.is_none());
        assert!(failure.detached.is_some());
    }

    #[tokio::test]
    async fn refused_submission_identity_aborts_session() {
        let factory = ScriptedSessionFactory::new();
        factory.script_unit("1", [ScriptedLoad::ready("H-1")]);
        let submitter = Arc::new(ScriptedSubmitter::new());
        submitter.fail(SubmitError::IdentityRefused("HTTP 401".into()));

        let Err(HandoffError::Session(AcquisitionError::SessionLost(detail))) =
            run(&factory, &submitter).await
        else {
            panic!("expected session loss");
        };
        assert!(detail.contains("HTTP 401"), "{detail}");
    }
}

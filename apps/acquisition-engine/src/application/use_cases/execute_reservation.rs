//! Execute Reservation Use Case (Execution Coordinator)
//!
//! Consumes one [`ReservationRequest`] and produces exactly one
//! [`ExecutionResult`]:
//!
//! 1. Validate the request and resolve the slot configuration
//! 2. Plan against the window rule (immediate or precision)
//! 3. Coarse wait until shortly before the open instant
//! 4. Open a session, decrypt credentials, log in, measure the clock
//! 5. Walk candidate units in order; the first load of a unit waits for the
//!    send instant, retries fire immediately
//! 6. On `Ready`, hand off to token extraction and protocol submission
//!
//! The session is always closed, including on cancellation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::token_handoff::{HandoffError, HandoffFields, TokenHandoff};
use crate::application::ports::{
    AcquisitionSession, CredentialDecryptor, ProtocolSubmitter, SessionError, SessionFactory,
    Settler, TimeProbe, View,
};
use crate::application::services::{ClockSynchronizer, ResponseClassifier};
use crate::config::{Config, ConfigError, SyncConfig};
use crate::domain::acquisition::{
    AbandonReason, Classification, RedirectRules, UnitDecision, UnitTracker,
};
use crate::domain::reservation::{
    AcquisitionAttempt, DesiredSlot, ExecutionResult, ReservationRequest, UnitSummary,
};
use crate::domain::scheduling::{ExecutionStrategy, SyncEstimate, WindowRule};
use crate::domain::shared::{ConfirmationId, UnitId};
use crate::domain::slot_config::{SlotConfiguration, SlotTable};
use crate::error::AcquisitionError;
use crate::observability::{record_attempt, record_execution, record_send_skew};

/// Coordinator tunables.
#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    /// Window rule.
    pub window: WindowRule,
    /// Every unit the service offers, for "accept any".
    pub known_units: Vec<UnitId>,
    /// Loads per unit for retryable outcomes.
    pub max_retries: u32,
    /// How long before the open instant the coarse wait ends.
    pub pre_position: Duration,
    /// Clock sync tuning.
    pub sync: SyncConfig,
    /// Handoff field names and timeouts.
    pub handoff: HandoffFields,
}

impl ExecutionSettings {
    /// Build settings from configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            window: config.window.rule()?,
            known_units: config
                .remote
                .all_units
                .iter()
                .map(|u| UnitId::new(u.as_str()))
                .collect(),
            max_retries: config.retry.max_retries,
            pre_position: Duration::from_millis(config.sync.pre_position_ms),
            sync: config.sync.clone(),
            handoff: HandoffFields {
                hold_field: config.remote.hold_field.clone(),
                identity_fields: config.remote.identity_fields.clone(),
                token_field: config.remote.token_field.clone(),
                token_timeout: Duration::from_millis(config.settle.token_timeout_ms),
            },
        })
    }
}

/// Adapters the coordinator drives.
pub struct ExecutionPorts<F, S, P, D> {
    /// Opens one session per execution.
    pub sessions: Arc<F>,
    /// Final write.
    pub submitter: Arc<S>,
    /// Remote time endpoint.
    pub probe: Arc<P>,
    /// Credential decryption.
    pub decryptor: Arc<D>,
    /// Settle delays.
    pub settler: Arc<dyn Settler>,
}

impl<F, S, P, D> Clone for ExecutionPorts<F, S, P, D> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            submitter: Arc::clone(&self.submitter),
            probe: Arc::clone(&self.probe),
            decryptor: Arc::clone(&self.decryptor),
            settler: Arc::clone(&self.settler),
        }
    }
}

/// One finished execution.
#[derive(Debug, Clone)]
pub struct Execution {
    /// The terminal result.
    pub result: ExecutionResult,
    /// Clock estimate in effect at the end, for seeding later executions.
    pub sync: SyncEstimate,
    /// The execution stopped on cancellation rather than an outcome.
    pub cancelled: bool,
}

#[derive(Default)]
struct Trail {
    attempts: Vec<AcquisitionAttempt>,
    units: Vec<UnitSummary>,
}

struct Job<'a> {
    request: &'a ReservationRequest,
    slot: &'a SlotConfiguration,
    candidates: &'a [UnitId],
    execute_at: Option<DateTime<Utc>>,
}

struct UnitRun<'a> {
    desired: DesiredSlot,
    slot: &'a SlotConfiguration,
    send_at: Option<DateTime<Utc>>,
    more_units: bool,
}

/// Use case running one reservation request end to end.
pub struct ExecuteReservationUseCase<F, S, P, D>
where
    F: SessionFactory,
    S: ProtocolSubmitter,
    P: TimeProbe + 'static,
    D: CredentialDecryptor,
{
    sessions: Arc<F>,
    probe: Arc<P>,
    decryptor: Arc<D>,
    classifier: ResponseClassifier,
    handoff: TokenHandoff<S>,
    slots: SlotTable,
    settings: ExecutionSettings,
}

impl<F, S, P, D> ExecuteReservationUseCase<F, S, P, D>
where
    F: SessionFactory,
    S: ProtocolSubmitter,
    P: TimeProbe + 'static,
    D: CredentialDecryptor,
{
    /// Create a new ExecuteReservationUseCase.
    pub fn new(
        ports: ExecutionPorts<F, S, P, D>,
        classifier: ResponseClassifier,
        redirects: RedirectRules,
        slots: SlotTable,
        settings: ExecutionSettings,
    ) -> Self {
        let handoff = TokenHandoff::new(
            ports.submitter,
            ports.settler,
            redirects,
            settings.handoff.clone(),
        );
        Self {
            sessions: ports.sessions,
            probe: ports.probe,
            decryptor: ports.decryptor,
            classifier,
            handoff,
            slots,
            settings,
        }
    }

    /// Create the use case from configuration.
    pub fn from_config(
        ports: ExecutionPorts<F, S, P, D>,
        config: &Config,
    ) -> Result<Self, ConfigError> {
        let markers = config.classifier.marker_table().map_err(|e| {
            ConfigError::ValidationError(format!("classifier.countdown_patterns: {e}"))
        })?;
        let classifier = ResponseClassifier::new(
            markers,
            config.remote.hold_field.clone(),
            Duration::from_millis(config.settle.field_timeout_ms),
        );

        Ok(Self::new(
            ports,
            classifier,
            config.redirect_rules()?,
            config.slots.clone(),
            ExecutionSettings::from_config(config)?,
        ))
    }

    /// Run one request to its terminal result.
    ///
    /// `seed` is an earlier clock estimate used until this execution measures
    /// its own.
    pub async fn execute(
        &self,
        request: &ReservationRequest,
        seed: Option<SyncEstimate>,
        cancel: &CancellationToken,
    ) -> Execution {
        let span = tracing::info_span!(
            "execute_reservation",
            request_id = %request.id,
            principal = %request.principal,
            date = %request.target_date,
            variant = %request.variant,
        );

        async {
            let mut sync = ClockSynchronizer::new(self.probe.clone(), &self.settings.sync);
            if let Some(seed) = seed {
                sync.seed(seed);
            }
            let mut trail = Trail::default();

            let outcome = self.acquire(request, &mut sync, &mut trail, cancel).await;
            let cancelled = matches!(outcome, Err(AcquisitionError::Cancelled));

            let result = match outcome {
                Ok((unit, confirmation)) => {
                    record_execution("success", "none");
                    tracing::info!(unit = %unit, confirmation = %confirmation, "Reservation acquired");
                    ExecutionResult::acquired(unit, confirmation, trail.attempts, trail.units)
                }
                Err(e) => {
                    record_execution("failure", e.code());
                    tracing::warn!(code = e.code(), error = %e, "Reservation failed");
                    ExecutionResult::failed(e.to_string(), trail.attempts, trail.units)
                }
            };

            Execution {
                result,
                sync: sync.estimate(),
                cancelled,
            }
        }
        .instrument(span)
        .await
    }

    async fn acquire(
        &self,
        request: &ReservationRequest,
        sync: &mut ClockSynchronizer,
        trail: &mut Trail,
        cancel: &CancellationToken,
    ) -> Result<(UnitId, ConfirmationId), AcquisitionError> {
        request.validate()?;
        let slot = self.slots.resolve(request.variant, &request.party)?;
        let candidates = request.candidate_units(&self.settings.known_units);
        if candidates.is_empty() {
            return Err(AcquisitionError::Configuration(
                "no candidate units to try".to_string(),
            ));
        }

        let plan = self
            .settings
            .window
            .plan(request.target_date, sync.synchronized_now());
        tracing::info!(
            strategy = %plan.strategy,
            open_instant = %plan.open_instant,
            candidates = candidates.len(),
            "{}",
            plan.justification
        );

        let execute_at = match plan.strategy {
            ExecutionStrategy::Immediate => None,
            ExecutionStrategy::Precision { execute_at } => Some(execute_at),
        };

        if let Some(at) = execute_at {
            let lead = chrono::Duration::from_std(self.settings.pre_position)
                .unwrap_or_else(|_| chrono::Duration::zero());
            let wake = at - lead;
            tracing::debug!(wake = %wake, "Waiting to pre-position");
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(AcquisitionError::Cancelled),
                () = sync.wait_until(wake) => {}
            }
        }

        let mut session = self
            .sessions
            .open()
            .await
            .map_err(|e| AcquisitionError::SessionLost(format!("cannot open session: {e}")))?;

        let job = Job {
            request,
            slot: &slot,
            candidates: &candidates,
            execute_at,
        };

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(AcquisitionError::Cancelled),
            r = self.run_session(session.as_mut(), &job, sync, trail, cancel) => r,
        };

        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, "Session close failed");
        }

        outcome
    }

    async fn run_session(
        &self,
        session: &mut dyn AcquisitionSession,
        job: &Job<'_>,
        sync: &mut ClockSynchronizer,
        trail: &mut Trail,
        cancel: &CancellationToken,
    ) -> Result<(UnitId, ConfirmationId), AcquisitionError> {
        let credentials = self
            .decryptor
            .decrypt(&job.request.principal, &job.request.credential)
            .await
            .map_err(|e| AcquisitionError::Credentials(e.to_string()))?;

        session
            .authenticate(&credentials)
            .await
            .map_err(|e| match e {
                SessionError::Rejected(message) => AcquisitionError::Authentication(message),
                other => AcquisitionError::Authentication(other.to_string()),
            })?;
        drop(credentials);
        tracing::info!("Authenticated");

        sync.measure().await;
        let send_at = job.execute_at.map(|at| sync.send_instant(at));
        if let Some(at) = send_at {
            tracing::info!(send_at = %at, rtt_ms = sync.estimate().rtt_ms, "Send instant fixed");
        }

        for (index, unit) in job.candidates.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(AcquisitionError::Cancelled);
            }

            let run = UnitRun {
                desired: job.request.desired_slot(),
                slot: job.slot,
                send_at,
                more_units: index + 1 < job.candidates.len(),
            };

            let span = tracing::info_span!("unit", unit = %unit, priority = index + 1);
            if let Some(confirmation) = self
                .attempt_unit(session, unit, &run, sync, trail)
                .instrument(span)
                .await?
            {
                return Ok((unit.clone(), confirmation));
            }
        }

        Err(AcquisitionError::AllUnitsExhausted {
            summary: summarize(&trail.units),
        })
    }

    /// Work one unit until it is acquired (`Some`) or abandoned (`None`).
    async fn attempt_unit(
        &self,
        session: &mut dyn AcquisitionSession,
        unit: &UnitId,
        run: &UnitRun<'_>,
        sync: &ClockSynchronizer,
        trail: &mut Trail,
    ) -> Result<Option<ConfirmationId>, AcquisitionError> {
        let mut tracker = UnitTracker::new(unit.clone(), self.settings.max_retries);

        loop {
            let attempt = tracker.begin_attempt()?;

            if attempt == 1
                && let Some(at) = run.send_at
            {
                sync.wait_until(at).await;
                let skew = sync.synchronized_now() - at;
                record_send_skew(skew.num_microseconds().unwrap_or(0) as f64 / 1_000_000.0);
            }

            let started_at = Utc::now();
            let (classification, view) = match session.load_candidate(unit, &run.desired).await {
                Ok(view) => {
                    let classified = self.classifier.classify(session, &view).await;
                    (classified.classification, Some(view))
                }
                Err(e @ (SessionError::IdentityLost(_) | SessionError::HoldOpen { .. })) => {
                    return Err(AcquisitionError::SessionLost(e.to_string()));
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "Candidate load failed");
                    (Classification::TransientError, None)
                }
            };

            trail.attempts.push(AcquisitionAttempt {
                unit: unit.clone(),
                attempt,
                outcome: classification,
                started_at,
                finished_at: Utc::now(),
            });
            record_attempt(classification);
            tracing::info!(attempt, outcome = %classification, "Candidate classified");

            let view = match (tracker.record(classification)?, view) {
                (UnitDecision::Retry, _) => continue,
                (UnitDecision::Abandon(reason), view) => {
                    self.abandon(session, view, unit, &reason).await;
                    trail.units.push(summary(&tracker));
                    return Ok(None);
                }
                (UnitDecision::Proceed, Some(view)) => view,
                (UnitDecision::Proceed, None) => {
                    let reason = AbandonReason::Transport {
                        detail: "ready without a view".to_string(),
                    };
                    tracker.abandon(reason.clone())?;
                    self.abandon(session, None, unit, &reason).await;
                    trail.units.push(summary(&tracker));
                    return Ok(None);
                }
            };

            return match self.handoff.run(session, view, run.slot).await {
                Ok(confirmation) => {
                    tracker.mark_acquired()?;
                    trail.units.push(summary(&tracker));
                    Ok(Some(confirmation))
                }
                Err(HandoffError::Session(e)) => {
                    trail.units.push(summary(&tracker));
                    Err(e)
                }
                Err(HandoffError::Unit(failure)) => {
                    tracker.abandon(failure.reason.clone())?;
                    if let Some(state) = &failure.detached
                        && run.more_units
                        && let Err(e) = session.reattach(state).await
                    {
                        trail.units.push(summary(&tracker));
                        return Err(AcquisitionError::SessionLost(format!(
                            "reattach failed: {e}"
                        )));
                    }
                    self.abandon(session, failure.view, unit, &failure.reason)
                        .await;
                    trail.units.push(summary(&tracker));
                    Ok(None)
                }
            };
        }
    }

    /// Release any open hold and log the abandon.
    async fn abandon(
        &self,
        session: &mut dyn AcquisitionSession,
        view: Option<View>,
        unit: &UnitId,
        reason: &AbandonReason,
    ) {
        if let Some(view) = view
            && let Err(e) = session.release(view).await
        {
            tracing::warn!(error = %e, "Hold release failed");
        }

        let error = AcquisitionError::from_abandon(unit, reason);
        tracing::warn!(code = error.code(), reason = %reason, "Unit abandoned");
    }
}

fn summary(tracker: &UnitTracker) -> UnitSummary {
    UnitSummary {
        unit: tracker.unit().clone(),
        attempts: tracker.attempts(),
        final_classification: tracker.last_outcome(),
        abandon_reason: tracker.abandon_reason().cloned(),
    }
}

fn summarize(units: &[UnitSummary]) -> String {
    units
        .iter()
        .map(|u| {
            let reason = u
                .abandon_reason
                .as_ref()
                .map_or_else(|| "not resolved".to_string(), ToString::to_string);
            format!("unit {}: {reason}", u.unit)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

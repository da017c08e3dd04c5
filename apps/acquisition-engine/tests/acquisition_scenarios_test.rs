//! Acquisition Scenario Tests
//!
//! Drives the execution coordinator end to end against the scripted remote
//! service: classification, unit fallback, retries, handoff and cancellation.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use test_case::test_case;
use tokio_util::sync::CancellationToken;

use acquisition_engine::application::ports::{SessionError, SubmitError};
use acquisition_engine::application::services::{InstantSettler, ResponseClassifier};
use acquisition_engine::application::use_cases::{
    ExecuteReservationUseCase, ExecutionPorts, ExecutionSettings, HandoffFields,
};
use acquisition_engine::config::SyncConfig;
use acquisition_engine::domain::acquisition::{MarkerTable, RedirectRules};
use acquisition_engine::domain::reservation::{
    EncryptedCredential, ExecutionResult, Participant, ReservationRequest, ReservationVariant,
};
use acquisition_engine::domain::scheduling::WindowRule;
use acquisition_engine::domain::shared::{ConfirmationId, PrincipalId, RequestId, UnitId};
use acquisition_engine::domain::slot_config::SlotTable;
use acquisition_engine::infrastructure::credentials::PassthroughDecryptor;
use acquisition_engine::infrastructure::remote::{
    FixedOffsetProbe, ScriptedLoad, ScriptedSessionFactory, ScriptedSubmitter, SessionEvent,
};

// =============================================================================
// Harness
// =============================================================================

type Executor = ExecuteReservationUseCase<
    ScriptedSessionFactory,
    ScriptedSubmitter,
    FixedOffsetProbe,
    PassthroughDecryptor,
>;

struct Harness {
    factory: ScriptedSessionFactory,
    submitter: Arc<ScriptedSubmitter>,
    executor: Executor,
}

fn harness_with(window: WindowRule, known_units: &[&str]) -> Harness {
    let factory = ScriptedSessionFactory::new();
    let submitter = Arc::new(ScriptedSubmitter::new());

    let ports = ExecutionPorts {
        sessions: Arc::new(factory.clone()),
        submitter: Arc::clone(&submitter),
        probe: Arc::new(FixedOffsetProbe::new(0)),
        decryptor: Arc::new(PassthroughDecryptor),
        settler: Arc::new(InstantSettler),
    };
    let settings = ExecutionSettings {
        window,
        known_units: known_units.iter().map(|u| UnitId::new(*u)).collect(),
        max_retries: 2,
        pre_position: Duration::from_millis(500),
        sync: SyncConfig::default(),
        handoff: HandoffFields {
            hold_field: "hold_id".into(),
            identity_fields: vec!["member_ref".into()],
            token_field: "token".into(),
            token_timeout: Duration::from_millis(100),
        },
    };
    let classifier = ResponseClassifier::new(
        MarkerTable::defaults().unwrap(),
        "hold_id",
        Duration::from_millis(50),
    );

    let executor = ExecuteReservationUseCase::new(
        ports,
        classifier,
        RedirectRules::defaults().unwrap(),
        SlotTable::builtin(),
        settings,
    );

    Harness {
        factory,
        submitter,
        executor,
    }
}

/// Harness whose window opened long ago: every execution is immediate.
fn harness() -> Harness {
    harness_with(past_window(), &[])
}

fn past_window() -> WindowRule {
    WindowRule::new(
        NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        6,
        chrono_tz::America::New_York,
    )
}

fn request(units: &[&str]) -> ReservationRequest {
    ReservationRequest {
        id: RequestId::new("req-1"),
        principal: PrincipalId::new("principal-1"),
        credential: EncryptedCredential {
            username: "alice".into(),
            encrypted_secret: "s3cret".into(),
        },
        target_date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
        target_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        variant: ReservationVariant::Short,
        party: vec![Participant::new("Alice", Some("1001".into()))],
        units: units.iter().map(|u| UnitId::new(*u)).collect(),
        accept_any_unit: false,
    }
}

impl Harness {
    async fn run(&self, request: &ReservationRequest) -> ExecutionResult {
        self.executor
            .execute(request, None, &CancellationToken::new())
            .await
            .result
    }
}

fn units(ids: &[&str]) -> Vec<UnitId> {
    ids.iter().map(|u| UnitId::new(*u)).collect()
}

// =============================================================================
// Reference scenarios
// =============================================================================

#[tokio::test]
async fn single_ready_unit_is_confirmed() {
    let h = harness();
    h.factory.script_unit("1", [ScriptedLoad::ready("H-1")]);
    h.submitter.confirm("278890");

    let result = h.run(&request(&["1"])).await;

    assert!(result.is_success(), "{}", result.reason());
    assert_eq!(result.confirmation_id(), Some(&ConfirmationId::new("278890")));
    assert_eq!(result.acquired_unit(), Some(&UnitId::new("1")));
    assert_eq!(result.attempted_units(), units(&["1"]));
}

#[tokio::test]
async fn held_unit_falls_through_without_retry() {
    let h = harness();
    h.factory.script_unit("1", [ScriptedLoad::held_by_other()]);
    h.factory.script_unit("2", [ScriptedLoad::ready("H-2")]);
    h.submitter.confirm("500100");

    let result = h.run(&request(&["1", "2"])).await;

    assert!(result.is_success());
    assert_eq!(result.acquired_unit(), Some(&UnitId::new("2")));
    assert_eq!(result.attempted_units(), units(&["1", "2"]));
    assert_eq!(h.factory.load_count("1"), 1);
}

#[tokio::test]
async fn too_early_twice_exhausts_retries() {
    let h = harness();
    h.factory.script_unit("1", [ScriptedLoad::too_early()]);

    let result = h.run(&request(&["1"])).await;

    assert!(!result.is_success());
    assert_eq!(result.attempted_units(), units(&["1"]));
    assert!(
        result.reason().contains("exhausted retries"),
        "reason: {}",
        result.reason()
    );
    assert_eq!(h.factory.load_count("1"), 2);
    assert!(h.submitter.forms().is_empty());
}

// =============================================================================
// Unit ordering and retries
// =============================================================================

#[test_case(1 ; "first unit")]
#[test_case(2 ; "second unit")]
#[test_case(3 ; "third unit")]
#[test_case(4 ; "last unit")]
#[tokio::test]
async fn units_after_the_winner_are_never_loaded(winner: usize) {
    let h = harness();
    let ids = ["1", "2", "3", "4"];
    let failures = [
        ScriptedLoad::held_by_other(),
        ScriptedLoad::failure("Something went wrong"),
        ScriptedLoad::too_early(),
    ];
    for (index, id) in ids.iter().enumerate() {
        let position = index + 1;
        if position < winner {
            h.factory
                .script_unit(id, [failures[index % failures.len()].clone()]);
        } else {
            h.factory.script_unit(id, [ScriptedLoad::ready("H")]);
        }
    }
    h.submitter.confirm("1");

    let result = h.run(&request(&ids)).await;

    assert!(result.is_success());
    assert_eq!(result.acquired_unit(), Some(&UnitId::new(ids[winner - 1])));
    assert_eq!(result.attempted_units(), units(&ids[..winner]));
    for id in &ids[winner..] {
        assert_eq!(h.factory.load_count(id), 0, "unit {id} was loaded");
    }
}

#[tokio::test]
async fn slow_then_ready_succeeds_on_retry() {
    let h = harness();
    h.factory
        .script_unit("1", [ScriptedLoad::Slow, ScriptedLoad::ready("H-1")]);
    h.submitter.confirm("42");

    let result = h.run(&request(&["1"])).await;

    assert!(result.is_success());
    assert_eq!(result.attempts_for(&UnitId::new("1")), 2);
}

#[tokio::test]
async fn transient_error_is_not_retried() {
    let h = harness();
    h.factory
        .script_unit("1", [ScriptedLoad::failure("Something went wrong")]);

    let result = h.run(&request(&["1"])).await;

    assert!(!result.is_success());
    assert_eq!(h.factory.load_count("1"), 1);
}

#[tokio::test]
async fn accept_any_tries_known_units_after_listed_ones() {
    let h = harness_with(past_window(), &["1", "2", "3"]);
    h.factory.script_unit("2", [ScriptedLoad::held_by_other()]);
    h.factory.script_unit("1", [ScriptedLoad::ready("H-1")]);
    h.submitter.confirm("77");

    let mut req = request(&["2"]);
    req.accept_any_unit = true;
    let result = h.run(&req).await;

    assert!(result.is_success());
    assert_eq!(result.attempted_units(), units(&["2", "1"]));
    assert_eq!(h.factory.load_count("3"), 0);
}

#[tokio::test]
async fn rejected_submission_reattaches_and_moves_on() {
    let h = harness();
    h.factory.script_unit("1", [ScriptedLoad::ready("H-1")]);
    h.factory.script_unit("2", [ScriptedLoad::ready("H-2")]);
    h.submitter.redirect("/error?reason=taken");
    h.submitter.confirm("900");

    let result = h.run(&request(&["1", "2"])).await;

    assert!(result.is_success());
    assert_eq!(result.acquired_unit(), Some(&UnitId::new("2")));
    assert_eq!(h.factory.count(&SessionEvent::Reattach), 1);
    assert_eq!(h.submitter.forms().len(), 2);
}

#[tokio::test]
async fn submit_transport_failure_on_last_unit_exhausts() {
    let h = harness();
    h.factory.script_unit("1", [ScriptedLoad::ready("H-1")]);
    h.submitter
        .fail(SubmitError::Transport("connection reset".into()));

    let result = h.run(&request(&["1"])).await;

    assert!(!result.is_success());
    assert!(result.reason().starts_with("all units exhausted"));
    assert_eq!(h.factory.count(&SessionEvent::Reattach), 0);
}

// =============================================================================
// Session-scoped failures
// =============================================================================

#[tokio::test]
async fn refused_submission_identity_aborts_remaining_units() {
    let h = harness();
    h.factory.script_unit("1", [ScriptedLoad::ready("H-1")]);
    h.factory.script_unit("2", [ScriptedLoad::ready("H-2")]);
    h.submitter
        .fail(SubmitError::IdentityRefused("HTTP 401".into()));
    h.submitter.confirm("900");

    let result = h.run(&request(&["1", "2"])).await;

    assert!(!result.is_success());
    assert!(result.reason().starts_with("session lost"), "{}", result.reason());
    assert_eq!(h.factory.count(&SessionEvent::Reattach), 0);
    assert_eq!(h.factory.load_count("2"), 0);
    assert_eq!(h.submitter.forms().len(), 1);
    assert_eq!(result.attempted_units(), units(&["1"]));
}

#[tokio::test]
async fn failed_reattach_keeps_the_unit_summary() {
    let h = harness();
    h.factory.script_unit("1", [ScriptedLoad::ready("H-1")]);
    h.factory.script_unit("2", [ScriptedLoad::ready("H-2")]);
    h.factory
        .fail_reattach(SessionError::IdentityLost("cookie rejected".into()));
    h.submitter.redirect("/error?reason=taken");

    let result = h.run(&request(&["1", "2"])).await;

    assert!(result.reason().starts_with("session lost"), "{}", result.reason());
    assert_eq!(result.units().len(), 1);
    assert_eq!(result.units()[0].unit, UnitId::new("1"));
    assert!(result.units()[0].abandon_reason.is_some());
    assert_eq!(h.factory.load_count("2"), 0);
}

#[tokio::test]
async fn rejected_login_fails_without_loading() {
    let h = harness();
    h.factory.reject_login("bad password");

    let result = h.run(&request(&["1"])).await;

    assert!(!result.is_success());
    assert!(result.reason().starts_with("authentication failed"));
    assert!(h.factory.loads().is_empty());
    assert_eq!(h.factory.count(&SessionEvent::Close), 1);
}

#[tokio::test]
async fn lost_identity_aborts_remaining_units() {
    let h = harness();
    h.factory.script_unit(
        "1",
        [ScriptedLoad::Error(SessionError::IdentityLost(
            "cookie expired".into(),
        ))],
    );
    h.factory.script_unit("2", [ScriptedLoad::ready("H-2")]);

    let result = h.run(&request(&["1", "2"])).await;

    assert!(!result.is_success());
    assert!(result.reason().starts_with("session lost"));
    assert_eq!(h.factory.load_count("2"), 0);
    assert_eq!(h.factory.count(&SessionEvent::Close), 1);
}

#[tokio::test]
async fn unknown_party_size_is_configuration_error() {
    let h = harness();
    let mut req = request(&["1"]);
    req.party = (0..5)
        .map(|i| Participant::new(format!("P{i}"), None))
        .collect();

    let result = h.run(&req).await;

    assert!(!result.is_success());
    assert!(result.reason().starts_with("configuration error"));
    assert!(h.factory.events().is_empty());
}

#[tokio::test]
async fn cancellation_mid_load_still_closes_session() {
    let h = harness();
    h.factory.script_unit("1", [ScriptedLoad::ready("H-1")]);
    h.factory.delay_loads(Duration::from_secs(5));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let execution = h.executor.execute(&request(&["1"]), None, &cancel).await;

    assert!(!execution.result.is_success());
    assert_eq!(execution.result.reason(), "execution cancelled");
    assert_eq!(h.factory.count(&SessionEvent::Close), 1);
    assert!(h.submitter.forms().is_empty());
}

#[tokio::test]
async fn cancellation_after_ready_releases_the_hold() {
    let h = harness();
    h.factory.script_unit("1", [ScriptedLoad::ready("H-1")]);
    h.factory.delay_token(Duration::from_secs(5));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let execution = h.executor.execute(&request(&["1"]), None, &cancel).await;

    assert!(execution.cancelled);
    assert!(h.submitter.forms().is_empty());
    let events = h.factory.events();
    assert_eq!(
        &events[events.len() - 2..],
        &[
            SessionEvent::Release {
                unit: UnitId::new("1")
            },
            SessionEvent::Close,
        ]
    );
}

#[tokio::test]
async fn failed_execution_is_not_marked_cancelled() {
    let h = harness();
    h.factory.script_unit("1", [ScriptedLoad::held_by_other()]);
    let cancel = CancellationToken::new();

    let execution = h.executor.execute(&request(&["1"]), None, &cancel).await;
    cancel.cancel();

    assert!(!execution.result.is_success());
    assert!(!execution.cancelled);
}

// =============================================================================
// Precision timing
// =============================================================================

#[tokio::test]
async fn first_load_waits_for_the_open_instant() {
    let tz: Tz = chrono_tz::America::New_York;
    let open_at = Utc::now() + chrono::Duration::milliseconds(800);
    let local = open_at.with_timezone(&tz);
    let window = WindowRule::new(local.time(), 0, tz);

    let h = harness_with(window, &[]);
    h.factory.script_unit("1", [ScriptedLoad::ready("H-1")]);
    h.submitter.confirm("1");

    let mut req = request(&["1"]);
    req.target_date = local.date_naive();
    let result = h.run(&req).await;

    assert!(result.is_success());
    let first_load = h
        .factory
        .events()
        .into_iter()
        .find_map(|e| match e {
            SessionEvent::Load { at, .. } => Some(at),
            _ => None,
        })
        .unwrap();
    // Zero RTT: the send instant is the open instant itself.
    assert!(
        first_load >= open_at - chrono::Duration::milliseconds(5),
        "loaded {first_load}, window opens {open_at}"
    );
}

#[tokio::test]
async fn retry_after_too_early_fires_immediately() {
    let tz: Tz = chrono_tz::America::New_York;
    let open_at = Utc::now() + chrono::Duration::milliseconds(800);
    let local = open_at.with_timezone(&tz);
    let window = WindowRule::new(local.time(), 0, tz);

    let h = harness_with(window, &[]);
    h.factory
        .script_unit("1", [ScriptedLoad::too_early(), ScriptedLoad::ready("H-1")]);
    h.submitter.confirm("1");

    let mut req = request(&["1"]);
    req.target_date = local.date_naive();
    let result = h.run(&req).await;

    assert!(result.is_success(), "{}", result.reason());
    let loads: Vec<_> = h
        .factory
        .events()
        .into_iter()
        .filter_map(|e| match e {
            SessionEvent::Load { at, .. } => Some(at),
            _ => None,
        })
        .collect();
    assert_eq!(loads.len(), 2);
    assert!(
        loads[0] >= open_at - chrono::Duration::milliseconds(5),
        "loaded {}, window opens {open_at}",
        loads[0]
    );
    let gap = loads[1] - loads[0];
    assert!(
        gap < chrono::Duration::milliseconds(50),
        "retry waited {gap}"
    );
}

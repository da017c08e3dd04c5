//! HTTP Adapter Tests
//!
//! Session, submitter and time probe against a wiremock booking service.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use acquisition_engine::application::ports::{
    AcquisitionSession, Credentials, Interaction, ProbeError, ProtocolSubmitter, SessionError,
    SessionFactory, SubmitError, TimeProbe,
};
use acquisition_engine::application::services::InstantSettler;
use acquisition_engine::config::RemoteConfig;
use acquisition_engine::domain::acquisition::SubmissionForm;
use acquisition_engine::domain::reservation::DesiredSlot;
use acquisition_engine::domain::shared::{HoldId, UnitId};
use acquisition_engine::infrastructure::remote::{
    HttpSessionFactory, HttpSubmitter, HttpTimeProbe,
};

const RESERVE_PAGE: &str = r#"<html><body>
<h1>Court 3 - Saturday 6:00 PM</h1>
<form method="post">
  <input type="hidden" name="hold_id" value="H-3">
  <input type="hidden" name="member_ref" value="M-1001">
  <select name="duration"><option>60</option><option>90</option></select>
</form>
</body></html>"#;

fn config(server: &MockServer) -> RemoteConfig {
    RemoteConfig {
        base_url: server.uri(),
        release_path: Some("/api/release".to_string()),
        request_timeout_ms: 2_000,
        ..RemoteConfig::default()
    }
}

fn slot() -> DesiredSlot {
    DesiredSlot {
        date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
        time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
    }
}

fn credentials() -> Credentials {
    Credentials {
        username: "alice".into(),
        secret: "s3cret".into(),
    }
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("username=alice"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "sid=abc123; Path=/")
                .set_body_string("<html>Welcome</html>"),
        )
        .mount(server)
        .await;
}

async fn mount_reserve_page(server: &MockServer, unit: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/reserve/{unit}/2025-03-15/18:00")))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESERVE_PAGE))
        .mount(server)
        .await;
}

// =============================================================================
// Time probe
// =============================================================================

#[tokio::test]
async fn probe_reads_epoch_millis_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/time"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"epoch_ms": 1_700_000_000_123_i64})))
        .mount(&server)
        .await;

    let probe = HttpTimeProbe::new(&config(&server)).unwrap();
    let time = probe.server_time().await.unwrap();

    assert_eq!(time, DateTime::from_timestamp_millis(1_700_000_000_123).unwrap());
}

#[tokio::test]
async fn probe_falls_back_to_date_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/time"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Date", "Tue, 14 Nov 2023 22:13:20 GMT")
                .set_body_string("ok"),
        )
        .mount(&server)
        .await;

    let probe = HttpTimeProbe::new(&config(&server)).unwrap();
    let time = probe.server_time().await.unwrap();

    assert_eq!(time, DateTime::from_timestamp(1_700_000_000, 0).unwrap());
}

#[tokio::test]
async fn probe_against_closed_port_is_transport_error() {
    let server = MockServer::start().await;
    let cfg = config(&server);
    drop(server);

    let probe = HttpTimeProbe::new(&cfg).unwrap();
    let result = probe.server_time().await;

    assert!(matches!(result, Err(ProbeError::Transport(_))));
}

// =============================================================================
// Session
// =============================================================================

#[tokio::test]
async fn login_then_load_exposes_hold_and_identity() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_reserve_page(&server, "3").await;

    let factory = HttpSessionFactory::new(config(&server));
    let mut session = factory.open().await.unwrap();
    session.authenticate(&credentials()).await.unwrap();

    let view = session
        .load_candidate(&UnitId::new("3"), &slot())
        .await
        .unwrap();
    assert!(view.address.ends_with("/reserve/3/2025-03-15/18:00"));

    let hold = session
        .await_field(&view, "hold_id", Duration::from_millis(200))
        .await
        .unwrap();
    assert_eq!(hold.as_deref(), Some("H-3"));

    let hidden = session
        .read_hidden_state(&view, &["hold_id".into(), "member_ref".into()])
        .await
        .unwrap();
    assert_eq!(hidden.get("member_ref").map(String::as_str), Some("M-1001"));

    let text = session.view_text(&view).await.unwrap();
    assert!(text.contains("Court 3"));

    let state = session.detach(view).await.unwrap();
    assert!(state.cookie_header.contains("sid=abc123"));
}

#[tokio::test]
async fn login_without_session_cookie_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Invalid password"))
        .mount(&server)
        .await;

    let mut session = HttpSessionFactory::new(config(&server)).open().await.unwrap();
    let result = session.authenticate(&credentials()).await;

    assert!(matches!(result, Err(SessionError::Rejected(_))));
}

#[tokio::test]
async fn unauthorized_login_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut session = HttpSessionFactory::new(config(&server)).open().await.unwrap();
    let result = session.authenticate(&credentials()).await;

    assert!(matches!(result, Err(SessionError::Rejected(_))));
}

#[tokio::test]
async fn second_unit_is_refused_until_hold_released() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_reserve_page(&server, "3").await;
    mount_reserve_page(&server, "4").await;
    Mock::given(method("POST"))
        .and(path("/api/release"))
        .and(body_string_contains("hold_id=H-3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = HttpSessionFactory::new(config(&server)).open().await.unwrap();
    session.authenticate(&credentials()).await.unwrap();
    let view = session
        .load_candidate(&UnitId::new("3"), &slot())
        .await
        .unwrap();

    let refused = session.load_candidate(&UnitId::new("4"), &slot()).await;
    assert!(matches!(refused, Err(SessionError::HoldOpen { .. })));

    session.release(view).await.unwrap();
    assert!(session.load_candidate(&UnitId::new("4"), &slot()).await.is_ok());
}

#[tokio::test]
async fn closing_with_an_open_hold_releases_it() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_reserve_page(&server, "3").await;
    Mock::given(method("POST"))
        .and(path("/api/release"))
        .and(body_string_contains("hold_id=H-3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = HttpSessionFactory::new(config(&server)).open().await.unwrap();
    session.authenticate(&credentials()).await.unwrap();
    session
        .load_candidate(&UnitId::new("3"), &slot())
        .await
        .unwrap();

    session.close().await.unwrap();
}

#[tokio::test]
async fn closing_after_release_does_not_release_again() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_reserve_page(&server, "3").await;
    Mock::given(method("POST"))
        .and(path("/api/release"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = HttpSessionFactory::new(config(&server)).open().await.unwrap();
    session.authenticate(&credentials()).await.unwrap();
    let view = session
        .load_candidate(&UnitId::new("3"), &slot())
        .await
        .unwrap();
    session.release(view).await.unwrap();

    session.close().await.unwrap();
}

#[tokio::test]
async fn failed_release_on_close_still_closes() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_reserve_page(&server, "3").await;
    Mock::given(method("POST"))
        .and(path("/api/release"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = HttpSessionFactory::new(config(&server)).open().await.unwrap();
    session.authenticate(&credentials()).await.unwrap();
    session
        .load_candidate(&UnitId::new("3"), &slot())
        .await
        .unwrap();

    assert!(session.close().await.is_ok());
}

#[tokio::test]
async fn expired_session_on_load_is_identity_loss() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/reserve/3/2025-03-15/18:00"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let mut session = HttpSessionFactory::new(config(&server)).open().await.unwrap();
    session.authenticate(&credentials()).await.unwrap();
    let result = session.load_candidate(&UnitId::new("3"), &slot()).await;

    assert!(matches!(result, Err(SessionError::IdentityLost(_))));
}

#[tokio::test]
async fn selection_posts_to_view_address_and_replaces_body() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_reserve_page(&server, "3").await;
    Mock::given(method("POST"))
        .and(path("/reserve/3/2025-03-15/18:00"))
        .and(body_string_contains("duration=90"))
        .and(body_string_contains("hold_id=H-3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<input type="hidden" name="hold_id" value="H-3"><p>90 minutes selected</p>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = HttpSessionFactory::new(config(&server)).open().await.unwrap();
    session.authenticate(&credentials()).await.unwrap();
    let mut view = session
        .load_candidate(&UnitId::new("3"), &slot())
        .await
        .unwrap();

    session
        .perform_interaction(
            &mut view,
            &[Interaction::Select {
                control: "duration".into(),
                value: "90".into(),
            }],
            &InstantSettler,
        )
        .await
        .unwrap();

    assert!(view.body.contains("90 minutes selected"));
}

#[tokio::test]
async fn token_is_minted_from_json_reply() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_reserve_page(&server, "3").await;
    Mock::given(method("GET"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("hold_id=H-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "T-abc"})))
        .mount(&server)
        .await;

    let mut session = HttpSessionFactory::new(config(&server)).open().await.unwrap();
    session.authenticate(&credentials()).await.unwrap();
    let view = session
        .load_candidate(&UnitId::new("3"), &slot())
        .await
        .unwrap();

    session
        .await_token_ready(&view, Duration::from_millis(500))
        .await
        .unwrap();
    let token = session.mint_token(&view, &HoldId::new("H-3")).await.unwrap();

    assert_eq!(token.as_str(), "T-abc");
}

#[tokio::test]
async fn token_never_ready_times_out() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_reserve_page(&server, "3").await;
    Mock::given(method("GET"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(425))
        .mount(&server)
        .await;

    let mut session = HttpSessionFactory::new(config(&server)).open().await.unwrap();
    session.authenticate(&credentials()).await.unwrap();
    let view = session
        .load_candidate(&UnitId::new("3"), &slot())
        .await
        .unwrap();

    let result = session
        .await_token_ready(&view, Duration::from_millis(300))
        .await;

    assert!(matches!(result, Err(SessionError::Timeout(_))));
}

// =============================================================================
// Submitter
// =============================================================================

fn form() -> SubmissionForm {
    let mut form = SubmissionForm::new();
    form.push("duration", "60");
    form.push("hold_id", "H-3");
    form.push("token", "T-abc");
    form
}

#[tokio::test]
async fn submitter_sends_cookies_and_returns_redirect_unfollowed() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_reserve_page(&server, "3").await;
    Mock::given(method("POST"))
        .and(path("/reservations"))
        .and(header("cookie", "sid=abc123"))
        .and(body_string_contains("hold_id=H-3"))
        .and(body_string_contains("token=T-abc"))
        .respond_with(
            ResponseTemplate::new(303).insert_header("Location", "/confirmation/278890"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cfg = config(&server);
    let mut session = HttpSessionFactory::new(cfg.clone()).open().await.unwrap();
    session.authenticate(&credentials()).await.unwrap();
    let view = session
        .load_candidate(&UnitId::new("3"), &slot())
        .await
        .unwrap();
    let state = session.detach(view).await.unwrap();

    let submitter = HttpSubmitter::new(&cfg).unwrap();
    let response = submitter.submit(&state, &form()).await.unwrap();

    assert_eq!(response.status, 303);
    assert_eq!(response.redirect.as_deref(), Some("/confirmation/278890"));
}

#[tokio::test]
async fn submitter_maps_unauthorized_to_identity_refused() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/reservations"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let submitter = HttpSubmitter::new(&config(&server)).unwrap();
    let state = acquisition_engine::application::ports::SessionState {
        cookie_header: "sid=stale".into(),
        origin: server.uri(),
        captured_at: Utc::now(),
    };
    let result = submitter.submit(&state, &form()).await;

    assert!(matches!(result, Err(SubmitError::IdentityRefused(_))));
}

//! Integration tests for the connection lifecycle against a scripted API.
//!
//! The scripted API records every call and plays back pre-loaded results; a
//! gate on `connection_state` lets tests hold a poll in flight to exercise
//! overlap suppression and stale-result discard.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use organizer_client::application::{ConnectionLifecycle, FaultKind, Stage};
use organizer_client::infrastructure::api::{ApiError, ResponseSnapshot, SessionApi};
use organizer_client::infrastructure::capture::mock::SAMPLE_JPEG_DATA_URI;
use organizer_client::infrastructure::capture::MockCaptureSource;
use organizer_core::{
    Base64Image, ConnectionId, ConnectionState, SendImageDirective, QR_CODE_PREFIX,
};
use tokio::sync::Notify;

const SESSION_UUID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
const OTHER_SESSION_UUID: &str = "9b2d9f3e-8f04-4f6e-9a3d-2f7c1e5b8a6d";

type Queue<T> = Mutex<VecDeque<T>>;
type CallLog = Arc<Mutex<Vec<&'static str>>>;

/// Hand-scripted session API: results are popped front-to-back, every call is
/// recorded, and the gates (when set) hold each `connection_state` or
/// `send_image` call until the test releases it.
#[derive(Default)]
struct ScriptedApi {
    join_results: Queue<Result<(), ApiError>>,
    state_results: Queue<Result<ConnectionState, ApiError>>,
    image_results: Queue<Result<SendImageDirective, ApiError>>,
    end_results: Queue<Result<(), ApiError>>,
    calls: CallLog,
    state_gate: Option<Arc<Notify>>,
    image_gate: Option<Arc<Notify>>,
}

impl ScriptedApi {
    fn record(&self, call: &'static str) {
        self.calls.lock().expect("call log lock").push(call);
    }
}

#[async_trait]
impl SessionApi for ScriptedApi {
    async fn join_connection(&self, _id: &ConnectionId) -> Result<(), ApiError> {
        self.record("join_connection");
        self.join_results
            .lock()
            .expect("join queue lock")
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn connection_state(&self, _id: &ConnectionId) -> Result<ConnectionState, ApiError> {
        self.record("connection_state");
        if let Some(gate) = &self.state_gate {
            gate.notified().await;
        }
        self.state_results
            .lock()
            .expect("state queue lock")
            .pop_front()
            .unwrap_or(Ok(ConnectionState::Connected))
    }

    async fn end_connection(&self, _id: &ConnectionId) -> Result<(), ApiError> {
        self.record("end_connection");
        self.end_results
            .lock()
            .expect("end queue lock")
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn send_image(
        &self,
        _id: &ConnectionId,
        _state: ConnectionState,
        image_base64: &str,
    ) -> Result<SendImageDirective, ApiError> {
        // Mirror the real implementation: validation happens before any
        // network traffic would.
        if let Err(violation) = Base64Image::parse(image_base64) {
            return Err(ApiError::InvalidImage(violation));
        }
        self.record("send_image");
        if let Some(gate) = &self.image_gate {
            gate.notified().await;
        }
        self.image_results
            .lock()
            .expect("image queue lock")
            .pop_front()
            .unwrap_or(Ok(SendImageDirective::MoreImages))
    }
}

fn transport_error(status: u16) -> ApiError {
    ApiError::Transport {
        response: ResponseSnapshot {
            status,
            status_text: "Error".to_string(),
            url: "http://test/op".to_string(),
            headers: Vec::new(),
        },
        body: "Not provided".to_string(),
    }
}

fn qr_payload(uuid: &str) -> String {
    format!("{QR_CODE_PREFIX}{uuid}")
}

async fn wait_for_calls(calls: &CallLog, n: usize) {
    for _ in 0..200 {
        if calls.lock().expect("call log lock").len() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("scripted api never reached {n} calls");
}

// ── Happy path ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_scan_poll_and_capture_walk_the_happy_path() {
    // Arrange
    let api = ScriptedApi::default();
    api.state_results
        .lock()
        .unwrap()
        .extend([Ok(ConnectionState::Connected), Ok(ConnectionState::Calibrating)]);
    let calls = Arc::clone(&api.calls);
    let lifecycle = ConnectionLifecycle::new(api);

    // Act / Assert – scan joins the session
    assert!(lifecycle.handle_scan(&qr_payload(SESSION_UUID)).await);
    assert_eq!(lifecycle.stage().await, Stage::Connected);

    // First poll: still connected, no transition
    lifecycle.poll_tick().await;
    assert_eq!(lifecycle.stage().await, Stage::Connected);

    // Second poll: the desktop moved to calibrating
    lifecycle.poll_tick().await;
    assert_eq!(lifecycle.stage().await, Stage::Calibrating);

    // One capture: directive recorded, stage unchanged
    let source = MockCaptureSource::scripted(vec![Some(SAMPLE_JPEG_DATA_URI.to_string())]);
    lifecycle.capture_tick(&source).await;
    let session = lifecycle.session().await;
    assert_eq!(session.stage, Stage::Calibrating);
    assert_eq!(session.last_directive, Some(SendImageDirective::MoreImages));
    assert!(session.last_fault.is_none());

    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            "join_connection",
            "connection_state",
            "connection_state",
            "send_image"
        ]
    );
}

// ── Scan handling ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_failed_join_faults_the_session_with_status() {
    // Arrange
    let api = ScriptedApi::default();
    api.join_results
        .lock()
        .unwrap()
        .push_back(Err(transport_error(401)));
    let lifecycle = ConnectionLifecycle::new(api);

    // Act
    let accepted = lifecycle.handle_scan(&qr_payload(SESSION_UUID)).await;

    // Assert
    assert!(accepted, "the payload itself was valid");
    let session = lifecycle.session().await;
    assert_eq!(session.stage, Stage::Faulted);
    let fault = session.last_fault.expect("fault recorded");
    assert_eq!(fault.kind, FaultKind::Transport);
    assert_eq!(fault.status, Some(401));
}

#[tokio::test]
async fn test_scan_during_active_session_is_ignored() {
    // Arrange
    let api = ScriptedApi::default();
    let calls = Arc::clone(&api.calls);
    let lifecycle = ConnectionLifecycle::new(api);
    assert!(lifecycle.handle_scan(&qr_payload(SESSION_UUID)).await);
    let original_id = lifecycle.session().await.connection_id;

    // Act – a second, different code is scanned mid-session
    let accepted = lifecycle.handle_scan(&qr_payload(OTHER_SESSION_UUID)).await;

    // Assert – no transition, no second join, same session
    assert!(!accepted);
    assert_eq!(lifecycle.session().await.connection_id, original_id);
    assert_eq!(
        calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == "join_connection")
            .count(),
        1
    );
}

// ── Overlap suppression and stale results ─────────────────────────────────────

#[tokio::test]
async fn test_poll_tick_during_in_flight_poll_is_suppressed() {
    // Arrange – polls block on the gate until released
    let gate = Arc::new(Notify::new());
    let api = ScriptedApi {
        state_gate: Some(Arc::clone(&gate)),
        ..Default::default()
    };
    api.state_results
        .lock()
        .unwrap()
        .push_back(Ok(ConnectionState::Calibrating));
    let calls = Arc::clone(&api.calls);
    let lifecycle = Arc::new(ConnectionLifecycle::new(api));
    assert!(lifecycle.handle_scan(&qr_payload(SESSION_UUID)).await);

    // Act – first poll blocks in flight, second arrives on top of it
    let first = tokio::spawn({
        let lifecycle = Arc::clone(&lifecycle);
        async move { lifecycle.poll_tick().await }
    });
    wait_for_calls(&calls, 2).await; // join + the gated poll
    lifecycle.poll_tick().await;

    // Assert – the overlapping tick issued no call
    assert_eq!(calls.lock().unwrap().len(), 2);

    gate.notify_one();
    first.await.expect("poll task");
    assert_eq!(lifecycle.stage().await, Stage::Calibrating);
}

#[tokio::test]
async fn test_capture_tick_during_in_flight_capture_is_suppressed() {
    // Arrange – reach calibrating, then make image submissions block on the
    // gate until released
    let gate = Arc::new(Notify::new());
    let api = ScriptedApi {
        image_gate: Some(Arc::clone(&gate)),
        ..Default::default()
    };
    api.state_results
        .lock()
        .unwrap()
        .push_back(Ok(ConnectionState::Calibrating));
    let calls = Arc::clone(&api.calls);
    let lifecycle = Arc::new(ConnectionLifecycle::new(api));
    assert!(lifecycle.handle_scan(&qr_payload(SESSION_UUID)).await);
    lifecycle.poll_tick().await;
    assert_eq!(lifecycle.stage().await, Stage::Calibrating);

    // Act – first capture blocks in flight, second arrives on top of it
    let first = tokio::spawn({
        let lifecycle = Arc::clone(&lifecycle);
        async move {
            let source = MockCaptureSource::sample_camera();
            lifecycle.capture_tick(&source).await;
        }
    });
    wait_for_calls(&calls, 3).await; // join + poll + the gated submission
    let source = MockCaptureSource::sample_camera();
    lifecycle.capture_tick(&source).await;

    // Assert – the overlapping tick issued no call
    assert_eq!(calls.lock().unwrap().len(), 3);

    gate.notify_one();
    first.await.expect("capture task");
    let session = lifecycle.session().await;
    assert_eq!(session.stage, Stage::Calibrating);
    assert_eq!(session.last_directive, Some(SendImageDirective::MoreImages));
}

#[tokio::test]
async fn test_poll_result_landing_after_end_is_discarded() {
    // Arrange
    let gate = Arc::new(Notify::new());
    let api = ScriptedApi {
        state_gate: Some(Arc::clone(&gate)),
        ..Default::default()
    };
    api.state_results
        .lock()
        .unwrap()
        .push_back(Ok(ConnectionState::Calibrating));
    let calls = Arc::clone(&api.calls);
    let lifecycle = Arc::new(ConnectionLifecycle::new(api));
    assert!(lifecycle.handle_scan(&qr_payload(SESSION_UUID)).await);

    let poll = tokio::spawn({
        let lifecycle = Arc::clone(&lifecycle);
        async move { lifecycle.poll_tick().await }
    });
    wait_for_calls(&calls, 2).await;

    // Act – the session ends while the poll is still in flight
    lifecycle.end().await;
    gate.notify_one();
    poll.await.expect("poll task");

    // Assert – the stale calibrating result did not resurrect the session
    let session = lifecycle.session().await;
    assert_eq!(session.stage, Stage::Idle);
    assert!(session.last_fault.is_none());
}

// ── Capture edge cases ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_capture_with_no_frame_skips_the_tick() {
    // Arrange – reach calibrating with a source that never produces a frame
    let api = ScriptedApi::default();
    api.state_results
        .lock()
        .unwrap()
        .push_back(Ok(ConnectionState::Calibrating));
    let calls = Arc::clone(&api.calls);
    let lifecycle = ConnectionLifecycle::new(api);
    assert!(lifecycle.handle_scan(&qr_payload(SESSION_UUID)).await);
    lifecycle.poll_tick().await;
    let source = MockCaptureSource::new();

    // Act
    lifecycle.capture_tick(&source).await;

    // Assert – still calibrating, nothing submitted
    assert_eq!(lifecycle.stage().await, Stage::Calibrating);
    assert!(!calls.lock().unwrap().contains(&"send_image"));
}

#[tokio::test]
async fn test_capture_with_unsubmittable_frame_is_recoverable() {
    // Arrange
    let api = ScriptedApi::default();
    api.state_results
        .lock()
        .unwrap()
        .push_back(Ok(ConnectionState::Calibrating));
    let lifecycle = ConnectionLifecycle::new(api);
    assert!(lifecycle.handle_scan(&qr_payload(SESSION_UUID)).await);
    lifecycle.poll_tick().await;
    // A PNG frame fails the JPEG data-URI check
    let source = MockCaptureSource::scripted(vec![
        Some("data:image/png;base64,AAAA".to_string()),
        Some(SAMPLE_JPEG_DATA_URI.to_string()),
    ]);

    // Act – bad frame first, good frame on the next tick
    lifecycle.capture_tick(&source).await;
    let after_bad = lifecycle.session().await;
    lifecycle.capture_tick(&source).await;
    let after_good = lifecycle.session().await;

    // Assert – the bad frame neither faulted nor stopped calibration
    assert_eq!(after_bad.stage, Stage::Calibrating);
    assert!(after_bad.last_fault.is_none());
    assert_eq!(after_good.last_directive, Some(SendImageDirective::MoreImages));
}

#[tokio::test]
async fn test_capture_transport_failure_faults_the_session() {
    // Arrange
    let api = ScriptedApi::default();
    api.state_results
        .lock()
        .unwrap()
        .push_back(Ok(ConnectionState::Calibrating));
    api.image_results
        .lock()
        .unwrap()
        .push_back(Err(transport_error(500)));
    let lifecycle = ConnectionLifecycle::new(api);
    assert!(lifecycle.handle_scan(&qr_payload(SESSION_UUID)).await);
    lifecycle.poll_tick().await;
    let source = MockCaptureSource::sample_camera();

    // Act
    lifecycle.capture_tick(&source).await;

    // Assert
    let session = lifecycle.session().await;
    assert_eq!(session.stage, Stage::Faulted);
    assert_eq!(session.last_fault.expect("fault").status, Some(500));
}

// ── Ending the session ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_end_resets_to_idle_even_when_the_request_fails() {
    // Arrange
    let api = ScriptedApi::default();
    api.end_results
        .lock()
        .unwrap()
        .push_back(Err(transport_error(500)));
    let calls = Arc::clone(&api.calls);
    let lifecycle = ConnectionLifecycle::new(api);
    assert!(lifecycle.handle_scan(&qr_payload(SESSION_UUID)).await);

    // Act
    lifecycle.end().await;

    // Assert – end is best-effort cleanup, never a gate
    let session = lifecycle.session().await;
    assert_eq!(session.stage, Stage::Idle);
    assert!(session.connection_id.is_none());
    assert!(session.last_fault.is_none());
    assert!(calls.lock().unwrap().contains(&"end_connection"));
}

#[tokio::test]
async fn test_losing_visibility_ends_an_active_session() {
    // Arrange
    let api = ScriptedApi::default();
    let calls = Arc::clone(&api.calls);
    let lifecycle = ConnectionLifecycle::new(api);
    assert!(lifecycle.handle_scan(&qr_payload(SESSION_UUID)).await);

    // Act
    lifecycle.handle_visibility(false).await;

    // Assert
    assert_eq!(lifecycle.stage().await, Stage::Idle);
    assert!(calls.lock().unwrap().contains(&"end_connection"));
}

#[tokio::test]
async fn test_visibility_changes_while_idle_do_nothing() {
    let api = ScriptedApi::default();
    let calls = Arc::clone(&api.calls);
    let lifecycle = ConnectionLifecycle::new(api);

    lifecycle.handle_visibility(false).await;
    lifecycle.handle_visibility(true).await;

    assert_eq!(lifecycle.stage().await, Stage::Idle);
    assert!(calls.lock().unwrap().is_empty());
}

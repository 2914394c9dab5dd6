//! ConnectionLifecycle: the client-side session state machine.
//!
//! The machine owns the `Session` value exclusively and is the only component
//! that mutates it.  Everything else — the QR widget, the camera, the timer
//! loop, the UI — either feeds it raw events (`handle_scan`, `poll_tick`,
//! `capture_tick`, `handle_visibility`, `end`) or reads snapshots.
//!
//! # Session lifecycle (for beginners)
//!
//! ```text
//! Idle ──scan──► Joining ──join ok──► Connected ──state=calibrating──► Calibrating
//!                   │                     │                                │
//!                   └──────── any transport/schema failure ────────────► Faulted
//!
//! any stage ──end()──► Idle
//! ```
//!
//! - `Idle`: nothing scanned yet, or the session was ended.
//! - `Joining`: a scanned payload matched and `join_connection` is resolving.
//! - `Connected`: joined; polling the session state on a fixed interval.
//! - `Calibrating`: the desktop asked for captures; streaming frames on a
//!   fixed interval.
//! - `Faulted`: a transport or schema failure was recorded; the machine never
//!   auto-retries, the UI decides what to do next.
//!
//! # No-overlap rule
//!
//! A poll or capture tick arriving while the previous tick of the same kind is
//! still waiting on the network is suppressed, so one session never
//! accumulates concurrent calls of the same operation.  Separately, every
//! stage transition bumps an epoch counter; a tick that resolves after the
//! stage it was issued in has been left discards its result instead of
//! applying it to a stale stage.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use organizer_core::{ConnectionId, ConnectionState, SendImageDirective, QR_CODE_PREFIX};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::infrastructure::api::{ApiError, SessionApi};
use crate::infrastructure::capture::CaptureSource;

// ── Stage ─────────────────────────────────────────────────────────────────────

/// Client-side lifecycle stage.
///
/// Distinct from [`ConnectionState`]: that is the server's authoritative view,
/// fetched by polling; this is where the client itself is in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// No session; waiting for a scan.
    Idle,
    /// Join request in flight.
    Joining,
    /// Joined; polling the session state.
    Connected,
    /// Streaming captures into the image queue.
    Calibrating,
    /// The desktop is organizing; captures are no longer needed.
    Organizing,
    /// The session completed.
    Done,
    /// A transport or schema failure was recorded; terminal until reset.
    Faulted,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Joining => "joining",
            Stage::Connected => "connected",
            Stage::Calibrating => "calibrating",
            Stage::Organizing => "organizing",
            Stage::Done => "done",
            Stage::Faulted => "faulted",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Fault ─────────────────────────────────────────────────────────────────────

/// Classification of the single current fault exposed to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Non-2xx response, connect failure, or timeout.
    Transport,
    /// 2xx response whose body does not match the contract.
    Schema,
}

/// The user-facing record of why the machine is `Faulted`.
///
/// Only one fault is held at a time; a new failure replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
    /// HTTP status, present for transport failures that got a response.
    pub status: Option<u16>,
}

impl Fault {
    /// Classifies an [`ApiError`] into the fault taxonomy.
    pub fn from_api_error(error: &ApiError) -> Self {
        let (kind, status) = match error {
            ApiError::Transport { response, .. } => (FaultKind::Transport, Some(response.status)),
            ApiError::Http(e) => (FaultKind::Transport, e.status().map(|s| s.as_u16())),
            ApiError::Schema { .. } | ApiError::InvalidImage(_) => (FaultKind::Schema, None),
        };
        Self {
            kind,
            status,
            message: error.to_string(),
        }
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// The client-side session value, owned and mutated only by the machine.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// The paired session, once a scan has been accepted.
    pub connection_id: Option<ConnectionId>,
    /// Current lifecycle stage.
    pub stage: Stage,
    /// The single current fault, when `stage` is `Faulted`.
    pub last_fault: Option<Fault>,
    /// Most recent directive returned by an image submission.
    pub last_directive: Option<SendImageDirective>,
}

impl Default for Stage {
    fn default() -> Self {
        Stage::Idle
    }
}

impl Session {
    /// A fresh session: idle, no id, no fault.
    pub fn idle() -> Self {
        Self::default()
    }
}

// ── Connection lifecycle ──────────────────────────────────────────────────────

/// The session state machine, generic over the [`SessionApi`] seam so tests
/// can substitute scripted implementations.
pub struct ConnectionLifecycle<A: SessionApi> {
    api: A,
    session: Mutex<Session>,
    /// Bumped on every stage transition; stale tick results are discarded by
    /// comparing against the value captured when the tick was issued.
    epoch: AtomicU64,
    poll_in_flight: AtomicBool,
    capture_in_flight: AtomicBool,
    qr_prefix: String,
}

impl<A: SessionApi> ConnectionLifecycle<A> {
    /// Creates an idle machine using the default QR prefix.
    pub fn new(api: A) -> Self {
        Self::with_qr_prefix(api, QR_CODE_PREFIX)
    }

    /// Creates an idle machine expecting a custom QR prefix.
    pub fn with_qr_prefix(api: A, qr_prefix: impl Into<String>) -> Self {
        Self {
            api,
            session: Mutex::new(Session::idle()),
            epoch: AtomicU64::new(0),
            poll_in_flight: AtomicBool::new(false),
            capture_in_flight: AtomicBool::new(false),
            qr_prefix: qr_prefix.into(),
        }
    }

    /// Snapshot of the current session for the presentation layer.
    pub async fn session(&self) -> Session {
        self.session.lock().await.clone()
    }

    /// The current lifecycle stage.
    pub async fn stage(&self) -> Stage {
        self.session.lock().await.stage
    }

    fn set_stage(&self, session: &mut Session, to: Stage) {
        let from = session.stage;
        session.stage = to;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        info!("session stage changed: {from} -> {to}");
    }

    fn fail(&self, session: &mut Session, error: &ApiError) {
        error!("session faulted: {error}");
        session.last_fault = Some(Fault::from_api_error(error));
        self.set_stage(session, Stage::Faulted);
    }

    /// Feeds a scanned QR payload into the machine.
    ///
    /// Returns `true` when the payload was accepted as a session reference
    /// (and the join was dispatched).  Foreign payloads and scans arriving
    /// while a session is already active are ignored: no transition, no
    /// fault.
    pub async fn handle_scan(&self, code: &str) -> bool {
        let Some(id) = ConnectionId::from_scanned_code_with_prefix(code, &self.qr_prefix) else {
            debug!("ignoring scanned payload that is not a session reference");
            return false;
        };

        let issued_epoch = {
            let mut session = self.session.lock().await;
            if session.stage != Stage::Idle {
                debug!("ignoring scan while a session is already active");
                return false;
            }
            session.connection_id = Some(id);
            self.set_stage(&mut session, Stage::Joining);
            self.epoch.load(Ordering::SeqCst)
        };

        info!("joining session {id}");
        let result = self.api.join_connection(&id).await;

        let mut session = self.session.lock().await;
        if self.epoch.load(Ordering::SeqCst) != issued_epoch {
            debug!("discarding join result for a superseded session");
            return true;
        }
        match result {
            Ok(()) => self.set_stage(&mut session, Stage::Connected),
            Err(e) => self.fail(&mut session, &e),
        }
        true
    }

    /// One poll tick: fetch the session state and react to it.
    ///
    /// Only meaningful in `Connected`; in any other stage the tick is a
    /// no-op.  A tick arriving while the previous poll is still in flight is
    /// suppressed.
    pub async fn poll_tick(&self) {
        if self.poll_in_flight.swap(true, Ordering::SeqCst) {
            debug!("poll tick suppressed; previous poll still in flight");
            return;
        }
        self.poll_once().await;
        self.poll_in_flight.store(false, Ordering::SeqCst);
    }

    async fn poll_once(&self) {
        let (id, issued_epoch) = {
            let session = self.session.lock().await;
            if session.stage != Stage::Connected {
                return;
            }
            let Some(id) = session.connection_id else {
                return;
            };
            (id, self.epoch.load(Ordering::SeqCst))
        };

        let result = self.api.connection_state(&id).await;

        let mut session = self.session.lock().await;
        if self.epoch.load(Ordering::SeqCst) != issued_epoch {
            debug!("discarding poll result issued for an earlier stage");
            return;
        }
        match result {
            // The only state that moves the machine forward.  Everything else
            // the server may report just keeps the poll loop going: a narrow
            // trigger, not a full mirror of the server state.
            Ok(ConnectionState::Calibrating) => self.set_stage(&mut session, Stage::Calibrating),
            Ok(state) => debug!("session still {state}; continuing to poll"),
            Err(e) => self.fail(&mut session, &e),
        }
    }

    /// One capture tick: take a frame from `source` and submit it.
    ///
    /// Only meaningful in `Calibrating`.  A missing frame and an
    /// unsubmittable frame are both recoverable: the tick is skipped and the
    /// machine stays in `Calibrating`.
    pub async fn capture_tick(&self, source: &dyn CaptureSource) {
        if self.capture_in_flight.swap(true, Ordering::SeqCst) {
            debug!("capture tick suppressed; previous capture still in flight");
            return;
        }
        self.capture_once(source).await;
        self.capture_in_flight.store(false, Ordering::SeqCst);
    }

    async fn capture_once(&self, source: &dyn CaptureSource) {
        let (id, issued_epoch) = {
            let session = self.session.lock().await;
            if session.stage != Stage::Calibrating {
                return;
            }
            let Some(id) = session.connection_id else {
                return;
            };
            (id, self.epoch.load(Ordering::SeqCst))
        };

        let Some(frame) = source.next_frame() else {
            warn!("no frame available; skipping capture tick");
            return;
        };

        let result = self
            .api
            .send_image(&id, ConnectionState::Calibrating, &frame)
            .await;

        let mut session = self.session.lock().await;
        if self.epoch.load(Ordering::SeqCst) != issued_epoch {
            debug!("discarding capture result issued for an earlier stage");
            return;
        }
        match result {
            Ok(directive) => {
                debug!("image accepted; directive: {directive}");
                session.last_directive = Some(directive);
                // TODO: drive the Organizing/Done transitions off `next_state`
                // once the desktop side of the contract settles; for now the
                // directive is recorded but does not advance the stage.
            }
            Err(ApiError::InvalidImage(violation)) => {
                warn!("capture produced an unsubmittable frame ({violation}); skipping tick");
            }
            Err(e) => self.fail(&mut session, &e),
        }
    }

    /// Ends the session: best-effort `end_connection`, then reset to `Idle`.
    ///
    /// The reset happens regardless of the HTTP outcome — end is cleanup, not
    /// a gate — so a failed end never leaves the machine stuck.
    pub async fn end(&self) {
        let id = { self.session.lock().await.connection_id };
        if let Some(id) = id {
            info!("ending session {id}");
            if let Err(e) = self.api.end_connection(&id).await {
                warn!("end_connection failed: {e}");
            }
        }

        let mut session = self.session.lock().await;
        *session = Session::idle();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        info!("session reset to idle");
    }

    /// Reacts to an app foreground/background signal.
    ///
    /// Losing visibility while a session is active ends it; becoming visible
    /// again does nothing (the user re-scans to start over).
    pub async fn handle_visibility(&self, visible: bool) {
        if visible {
            return;
        }
        if self.stage().await == Stage::Idle {
            return;
        }
        info!("app no longer visible; ending session");
        self.end().await;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

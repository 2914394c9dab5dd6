//! Session API boundary: the operation trait, the error taxonomy, and the
//! HTTP implementation in [`http`].
//!
//! The error taxonomy is a closed set of three failure classes:
//!
//! - **Input validation** (`InvalidImage`) – a malformed image payload,
//!   detected before any network call.  Recoverable; no side effects.
//! - **Transport** (`Transport`, `Http`) – a non-2xx response, or a request
//!   that never produced a response (connect failure, timeout).  Recoverable
//!   by re-issuing the operation; the state machine decides.
//! - **Schema** (`Schema`) – a 2xx response whose body does not match the
//!   contract.  As severe as a transport failure: it signals a contract
//!   mismatch between phone and bridge, and should not be blindly retried.
//!
//! Nothing at this layer retries or swallows an error; every failure is
//! surfaced to the connection lifecycle, which is the sole owner of
//! retry/fault decisions.

use async_trait::async_trait;
use organizer_core::{ConnectionId, ConnectionState, SchemaViolation, SendImageDirective};
use thiserror::Error;

pub mod http;

pub use http::{HttpSessionApi, Transport};

// ── Response metadata snapshot ────────────────────────────────────────────────

/// Response metadata captured at the moment a call fails.
///
/// Headers are snapshotted as owned strings so the error stays inspectable
/// after the response body has been consumed.
#[derive(Debug, Clone)]
pub struct ResponseSnapshot {
    /// HTTP status code, e.g. `500`.
    pub status: u16,
    /// Canonical reason phrase, e.g. `"Internal Server Error"`.
    pub status_text: String,
    /// Full request URL the failure occurred on.
    pub url: String,
    /// All response headers; non-UTF-8 values are recorded as `<binary>`.
    pub headers: Vec<(String, String)>,
}

// ── Error taxonomy ────────────────────────────────────────────────────────────

/// Every way a session API operation can fail.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The bridge answered with a non-2xx status.
    #[error("API error on {url} status: {status}", url = .response.url, status = .response.status)]
    Transport {
        response: ResponseSnapshot,
        /// Raw response body text, best-effort; `"Not provided"` when the
        /// body could not be read.
        body: String,
    },

    /// The bridge answered 2xx but the body does not match the contract.
    #[error("schema error on {url}: {violation}", url = .response.url)]
    Schema {
        response: ResponseSnapshot,
        /// The parsed-but-invalid JSON body (`null` when the body was not
        /// valid JSON at all).
        json: serde_json::Value,
        violation: SchemaViolation,
    },

    /// The image payload failed the data-URI format check; no network call
    /// was made.
    #[error("invalid image payload: {0}")]
    InvalidImage(SchemaViolation),

    /// The request never produced an HTTP response (connect failure, request
    /// timeout, TLS error).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    /// The HTTP status attached to this failure, when one exists.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Transport { response, .. } | ApiError::Schema { response, .. } => {
                Some(response.status)
            }
            ApiError::InvalidImage(_) => None,
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

// ── Session API trait ─────────────────────────────────────────────────────────

/// The four operations of the session protocol.
///
/// The HTTP implementation is [`HttpSessionApi`]; tests substitute scripted
/// implementations.  Every operation requires a [`ConnectionId`], which is
/// valid by construction, so implementations do not re-validate it.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// `POST /join_connection/{id}` – joins the session.  Empty 2xx body.
    async fn join_connection(&self, id: &ConnectionId) -> Result<(), ApiError>;

    /// `GET /connection_state/{id}` – fetches the authoritative session state.
    async fn connection_state(&self, id: &ConnectionId) -> Result<ConnectionState, ApiError>;

    /// `POST /end_connection/{id}` – ends the session.  Empty 2xx body.
    async fn end_connection(&self, id: &ConnectionId) -> Result<(), ApiError>;

    /// `POST /image_queue/{id}?state={state}` – submits one captured frame as
    /// multipart field `image_base64`.
    ///
    /// `image_base64` is validated against the JPEG data-URI format first; on
    /// failure the operation returns [`ApiError::InvalidImage`] without
    /// touching the network.
    async fn send_image(
        &self,
        id: &ConnectionId,
        state: ConnectionState,
        image_base64: &str,
    ) -> Result<SendImageDirective, ApiError>;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Session state vocabulary and JSON body validators for the bridge API.
//!
//! The bridge serves two JSON response shapes the mobile client must validate:
//!
//! ```json
//! { "state": "calibrating" }      // GET /connection_state/{id}
//! { "directive": "more_images" }  // POST /image_queue/{id}
//! ```
//!
//! Validation is total: every function in this module takes arbitrary decoded
//! JSON and returns either the typed value or a [`SchemaViolation`] naming the
//! violating path.  Nothing here panics or performs I/O, so the transport
//! layer can call these on every 2xx body without any failure path of its own.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ── Validation failure ────────────────────────────────────────────────────────

/// A structural mismatch between a value and the shape the protocol expects.
///
/// `path` names the JSON field (or `""` for the top-level value) and `message`
/// says what was wrong with it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{path}`: {message}")]
pub struct SchemaViolation {
    /// JSON path of the offending value, e.g. `state`.  Empty for the root.
    pub path: String,
    /// Human-readable reason the value was rejected.
    pub message: String,
}

impl SchemaViolation {
    /// Builds a violation at `path` with the given reason.
    pub fn at(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

// ── Connection state ──────────────────────────────────────────────────────────

/// Authoritative server-side stage of an organizer session.
///
/// The client never computes this locally; it is a snapshot fetched by
/// polling `GET /connection_state/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Session created on the desktop; no phone has joined yet.
    New,
    /// A phone has joined the session.
    Connected,
    /// The desktop is calibrating; the phone should stream captures.
    Calibrating,
    /// The desktop is organizing the received captures.
    Organizing,
    /// The session is complete.
    Done,
}

impl ConnectionState {
    /// Every state the bridge may report, in lifecycle order.
    pub const ALL: [ConnectionState; 5] = [
        ConnectionState::New,
        ConnectionState::Connected,
        ConnectionState::Calibrating,
        ConnectionState::Organizing,
        ConnectionState::Done,
    ];

    /// The exact string the bridge uses on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::New => "new",
            ConnectionState::Connected => "connected",
            ConnectionState::Calibrating => "calibrating",
            ConnectionState::Organizing => "organizing",
            ConnectionState::Done => "done",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionState {
    type Err = SchemaViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConnectionState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| SchemaViolation::at("", format!("unknown connection state `{s}`")))
    }
}

// ── Send-image directive ──────────────────────────────────────────────────────

/// Server instruction returned after an image submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendImageDirective {
    /// Keep capturing at the current stage.
    MoreImages,
    /// The client should advance to the next stage.
    NextState,
}

impl SendImageDirective {
    /// The exact string the bridge uses on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            SendImageDirective::MoreImages => "more_images",
            SendImageDirective::NextState => "next_state",
        }
    }
}

impl fmt::Display for SendImageDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SendImageDirective {
    type Err = SchemaViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "more_images" => Ok(SendImageDirective::MoreImages),
            "next_state" => Ok(SendImageDirective::NextState),
            other => Err(SchemaViolation::at(
                "",
                format!("unknown send-image directive `{other}`"),
            )),
        }
    }
}

// ── Response body validators ──────────────────────────────────────────────────

/// Extracts a required string field from a JSON object.
fn string_field<'a>(json: &'a Value, field: &str) -> Result<&'a str, SchemaViolation> {
    let object = json
        .as_object()
        .ok_or_else(|| SchemaViolation::at("", "expected a JSON object"))?;
    let value = object
        .get(field)
        .ok_or_else(|| SchemaViolation::at(field, "missing field"))?;
    value
        .as_str()
        .ok_or_else(|| SchemaViolation::at(field, "expected a string"))
}

/// Validates the body of `GET /connection_state/{id}`.
///
/// Succeeds only for an object whose `state` field holds one of the five
/// enumerated states.
///
/// # Errors
///
/// Returns a [`SchemaViolation`] naming the violating path; never panics.
pub fn validate_connection_state_response(json: &Value) -> Result<ConnectionState, SchemaViolation> {
    let raw = string_field(json, "state")?;
    raw.parse()
        .map_err(|v: SchemaViolation| SchemaViolation::at("state", v.message))
}

/// Validates the body of `POST /image_queue/{id}`.
///
/// # Errors
///
/// Returns a [`SchemaViolation`] naming the violating path; never panics.
pub fn validate_send_image_response(json: &Value) -> Result<SendImageDirective, SchemaViolation> {
    let raw = string_field(json, "directive")?;
    raw.parse()
        .map_err(|v: SchemaViolation| SchemaViolation::at("directive", v.message))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

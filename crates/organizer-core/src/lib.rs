//! # organizer-core
//!
//! Shared library for the Display Organizer mobile client containing the wire
//! vocabulary of the bridge API and the validation logic for everything that
//! crosses a trust boundary: server JSON bodies, scanned QR payloads, and
//! captured image payloads.
//!
//! This crate has zero dependencies on HTTP, timers, or the OS.  The client
//! application builds on it; a future desktop-side crate can share it.
//!
//! # Protocol overview (for beginners)
//!
//! The Display Organizer pairs a phone with a desktop "organizer" session.
//! The desktop shows a QR code; the phone scans it, joins the session over
//! HTTP, polls the session state until the desktop starts calibrating, and
//! then streams camera captures into the session's image queue.
//!
//! This crate defines:
//!
//! - **`protocol`** – The enumerated session states and directives the bridge
//!   serves, plus total (never-panicking) validators that turn untrusted JSON
//!   into those types or into a [`SchemaViolation`] naming what was wrong.
//!
//! - **`domain`** – The [`ConnectionId`] value type.  A connection id only
//!   exists if the scanned QR payload matched the fixed
//!   prefix-then-version-4-UUID pattern, so every id held by the client is
//!   known-good by construction.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `organizer_core::ConnectionState` instead of the full path.
pub use domain::connection_id::{ConnectionId, QR_CODE_PREFIX};
pub use protocol::image::Base64Image;
pub use protocol::model::{
    validate_connection_state_response, validate_send_image_response, ConnectionState,
    SchemaViolation, SendImageDirective,
};

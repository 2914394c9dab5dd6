//! organizer-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/` and
//! the binary entry point in `main.rs` share the same module tree.
//!
//! # What does organizer-client do? (for beginners)
//!
//! The Display Organizer desktop app shows a QR code identifying a fresh
//! session.  This client is the phone side of that pairing:
//!
//! 1. A scanned QR payload is matched against the fixed
//!    prefix-then-UUID pattern; a match yields the session's `ConnectionId`.
//! 2. The client joins the session over HTTP (`POST /join_connection/{id}`).
//! 3. It polls `GET /connection_state/{id}` on a fixed interval until the
//!    desktop reports `calibrating`.
//! 4. It then streams camera captures into `POST /image_queue/{id}` on a
//!    fixed interval until the session ends.
//!
//! The connection lifecycle state machine in [`application::lifecycle`] owns
//! all of that sequencing; the camera and QR widget are presentation-layer
//! collaborators that merely feed it raw strings.

/// Application layer: the connection lifecycle state machine and its driver.
pub mod application;

/// Infrastructure layer: HTTP transport, capture seam, and configuration.
pub mod infrastructure;

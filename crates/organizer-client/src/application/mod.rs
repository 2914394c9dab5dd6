//! Application layer: use cases for the session client.
//!
//! - [`lifecycle`] – the connection lifecycle state machine (the session's
//!   single owner).
//! - [`driver`] – the per-stage timer loop that feeds poll and capture ticks
//!   into the machine.

pub mod driver;
pub mod lifecycle;

pub use driver::drive_session;
pub use lifecycle::{ConnectionLifecycle, Fault, FaultKind, Session, Stage};

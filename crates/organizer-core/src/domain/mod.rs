//! Domain value types with no protocol or I/O dependencies.

pub mod connection_id;

pub use connection_id::{ConnectionId, QR_CODE_PREFIX};

//! Capture source seam.
//!
//! The real camera lives in the presentation layer; the state machine only
//! needs "give me the latest frame, if there is one".  Implementations use
//! interior mutability so a single source can be shared with the driver loop.

pub mod mock;

pub use mock::MockCaptureSource;

/// Supplier of captured frames for the calibration stage.
pub trait CaptureSource: Send + Sync {
    /// Returns the next captured frame as a JPEG data-URI candidate string,
    /// or `None` when no frame is currently available.
    ///
    /// Returning `None` is a normal, recoverable condition (camera warming
    /// up, capture in progress); the caller skips the tick and tries again on
    /// the next one.
    fn next_frame(&self) -> Option<String>;
}

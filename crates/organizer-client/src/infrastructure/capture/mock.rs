//! Mock capture source for unit testing and the demo binary.
//!
//! # Why a mock source?
//!
//! The real capture source is the phone camera, which cannot run in test
//! environments and cannot be scripted.  `MockCaptureSource` replaces it with
//! an in-memory script: a queue of `Option<String>` entries where `None`
//! simulates a tick on which no frame was available.  Once the script is
//! exhausted, an optional fallback frame repeats forever — that mode also
//! serves as the stand-in camera for the demo binary.
//!
//! # Usage in tests
//!
//! ```ignore
//! let source = MockCaptureSource::scripted(vec![
//!     None,                                   // first tick: no frame yet
//!     Some("data:image/jpeg;base64,...".into()),
//! ]);
//!
//! assert_eq!(source.next_frame(), None);
//! assert!(source.next_frame().is_some());
//! assert_eq!(source.calls(), 2);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::CaptureSource;

/// A 1x1 white JPEG as a data URI, small enough to embed and valid enough to
/// exercise the full submission path.
pub const SAMPLE_JPEG_DATA_URI: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRgABAQEAYABgAAD/2wBDAAgGBgcGBQgHBwcJCQgKDBQNDAsLDBkSEw8UHRofHh0aHBwgJC4nICIsIxwcKDcpLDAxNDQ0Hyc5PTgyPC4zNDL/wAALCAABAAEBAREA/8QAFAABAAAAAAAAAAAAAAAAAAAACf/EABQQAQAAAAAAAAAAAAAAAAAAAAD/2gAIAQEAAD8AVN//2Q==";

/// A capture source driven by an in-memory script.
#[derive(Default)]
pub struct MockCaptureSource {
    /// Scripted responses, consumed front to back.
    script: Mutex<VecDeque<Option<String>>>,
    /// Frame returned forever once the script is exhausted.
    fallback: Option<String>,
    /// Number of `next_frame` calls observed.
    calls: AtomicUsize,
}

impl MockCaptureSource {
    /// A source that never produces a frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// A source that plays back `script`, then returns `None` forever.
    pub fn scripted(script: Vec<Option<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A source that returns `frame` on every tick.
    pub fn repeating(frame: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(frame.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// The demo camera: repeats [`SAMPLE_JPEG_DATA_URI`] forever.
    pub fn sample_camera() -> Self {
        Self::repeating(SAMPLE_JPEG_DATA_URI)
    }

    /// Number of times `next_frame` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CaptureSource for MockCaptureSource {
    fn next_frame(&self) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script.lock().expect("capture script lock").pop_front();
        match scripted {
            Some(entry) => entry,
            None => self.fallback.clone(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

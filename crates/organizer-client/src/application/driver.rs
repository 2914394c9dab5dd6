//! Timer loop that feeds poll and capture ticks into the lifecycle.
//!
//! The original mobile app arms one interval timer per stage: a poll timer
//! while connected, a capture timer while calibrating, and none otherwise.
//! `drive_session` reproduces that shape — it watches the current stage, runs
//! the matching ticker while the stage holds, and drops the ticker the moment
//! the stage changes so no timer for a left stage keeps firing.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::application::lifecycle::{ConnectionLifecycle, Stage};
use crate::infrastructure::api::SessionApi;
use crate::infrastructure::capture::CaptureSource;

/// How long the loop sleeps while waiting for an in-flight join to resolve.
const JOIN_SETTLE_INTERVAL: Duration = Duration::from_millis(20);

/// Drives the session until it reaches a stage with no timer.
///
/// Runs the poll ticker while `Connected` and the capture ticker while
/// `Calibrating`; returns the stage the session settled in (`Idle`, `Done`,
/// `Organizing`, or `Faulted`).  Tick pacing comes from the caller; overlap
/// suppression is the machine's job, so a slow request at most delays the
/// next tick, never stacks one.
pub async fn drive_session<A: SessionApi>(
    lifecycle: Arc<ConnectionLifecycle<A>>,
    source: &dyn CaptureSource,
    poll_interval: Duration,
    capture_interval: Duration,
) -> Stage {
    loop {
        match lifecycle.stage().await {
            Stage::Joining => {
                // The join dispatched by handle_scan is still resolving.
                tokio::time::sleep(JOIN_SETTLE_INTERVAL).await;
            }
            Stage::Connected => {
                let mut ticker = interval(poll_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                while lifecycle.stage().await == Stage::Connected {
                    ticker.tick().await;
                    lifecycle.poll_tick().await;
                }
                // Ticker dropped here: leaving Connected cancels the poll timer.
            }
            Stage::Calibrating => {
                let mut ticker = interval(capture_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                while lifecycle.stage().await == Stage::Calibrating {
                    ticker.tick().await;
                    lifecycle.capture_tick(source).await;
                }
            }
            stage => {
                info!("driver stopping in stage {stage}");
                return stage;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

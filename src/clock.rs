//! Time source for the scheduler.
//!
//! The scheduler never calls `Utc::now()` or `tokio::time::sleep` directly;
//! it goes through a [`Clock`]. [`TokioClock`] derives wall-clock timestamps
//! from Tokio's monotonic clock, so under a paused runtime
//! (`tokio::time::pause`, `#[tokio::test(start_paused = true)]`) both sleeps
//! and timestamps follow virtual time.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Source of timestamps and timed waits.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Wait for `duration` to elapse on this clock.
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the Tokio timer.
#[derive(Debug, Clone)]
pub struct TokioClock {
    anchor_wall: DateTime<Utc>,
    anchor_instant: Instant,
}

impl TokioClock {
    /// Anchor a new clock at the current time.
    pub fn new() -> Self {
        Self {
            anchor_wall: Utc::now(),
            anchor_instant: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        offset(self.anchor_wall, self.anchor_instant.elapsed())
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Add a std duration to a timestamp, saturating on overflow.
pub(crate) fn offset(at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

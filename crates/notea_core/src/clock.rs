//! Wall-clock source for due-date defaults and reminder timing.
//!
//! All timestamps in core are Unix epoch milliseconds (`i64`).

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub const MINUTE_MS: i64 = 60 * 1000;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Time source shared by the task store and reminder scheduler.
pub trait Clock: Send + Sync {
    /// Current time in Unix epoch milliseconds.
    fn now_epoch_ms(&self) -> i64;
}

/// Clock backed by the operating system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_ms(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
            // Clock set before 1970; report it as negative time.
            Err(err) => -i64::try_from(err.duration().as_millis()).unwrap_or(i64::MAX),
        }
    }
}

/// Manually driven clock for hosts that replay time and for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_epoch_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(now_epoch_ms),
        }
    }

    pub fn set(&self, now_epoch_ms: i64) {
        self.now.store(now_epoch_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_epoch_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

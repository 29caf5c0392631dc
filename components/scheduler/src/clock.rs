//! Time sources.
//!
//! Timed detaches are driven by a [`Clock`] rather than by the host's wall
//! clock directly, so tests can step time by hand with [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Millisecond time source.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time in milliseconds. Must never go backwards.
    fn now_millis(&self) -> u64;

    /// Blocks the host thread until `deadline` or returns early. Called
    /// when every thread is detached and the earliest wake-up is in the
    /// future.
    fn idle_until(&self, deadline: u64);
}

/// Wall-clock time since the Unix epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64)
    }

    fn idle_until(&self, deadline: u64) {
        let now = self.now_millis();
        if deadline > now {
            std::thread::sleep(std::time::Duration::from_millis(deadline - now));
        }
    }
}

/// Hand-stepped clock. Idling jumps straight to the deadline.
///
/// # Examples
///
/// ```
/// use scheduler::{Clock, ManualClock};
///
/// let clock = ManualClock::new(100);
/// clock.advance(50);
/// assert_eq!(clock.now_millis(), 150);
/// clock.idle_until(400);
/// assert_eq!(clock.now_millis(), 400);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Clock starting at `start` milliseconds.
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Moves time forward.
    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn idle_until(&self, deadline: u64) {
        self.now.fetch_max(deadline, Ordering::SeqCst);
    }
}

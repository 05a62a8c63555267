//! Wall-clock abstraction used for TTL bookkeeping and id timestamps.
//!
//! Backends compute expiry deadlines from a [`Clock`] rather than calling
//! [`SystemTime::now`] directly, which lets tests move time forward with
//! [`MockClock`] instead of sleeping through a retention window.

use std::{
    ops::Add,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use parking_lot::RwLock;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> SystemTime;
}

/// [`Clock`] backed by the operating system's real-time clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually driven [`Clock`] for tests.
#[derive(Debug)]
pub struct MockClock {
    now: RwLock<SystemTime>,
}

impl MockClock {
    /// Creates a clock frozen at `time`.
    pub fn with_time(time: SystemTime) -> Self {
        Self { now: RwLock::new(time) }
    }

    /// Creates a clock frozen at `millis` milliseconds after the Unix epoch.
    pub fn at_unix_millis(millis: u64) -> Self {
        Self::with_time(UNIX_EPOCH + Duration::from_millis(millis))
    }

    /// Creates a clock frozen at the current system time.
    pub fn new() -> Self {
        Self::with_time(SystemTime::now())
    }

    /// Moves the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.write();
        *now = now.add(duration);
    }

    /// Sets the clock to an absolute time, which may be in the past.
    pub fn set_time(&self, time: SystemTime) {
        *self.now.write() = time;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> SystemTime {
        *self.now.read()
    }
}

/// Milliseconds since the Unix epoch, saturating at zero for pre-epoch times.
#[must_use]
pub fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

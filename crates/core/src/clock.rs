//! Injectable time source.
//!
//! Every "now" in the auth core flows through [`Clock`] so expiry logic is
//! testable without real delays. Production code uses [`SystemClock`];
//! tests use [`MockClock`] and advance it explicitly.

use std::sync::Mutex;

use chrono::Utc;

use crate::types::Timestamp;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current UTC time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time via [`chrono::Utc`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A settable clock for deterministic tests.
///
/// Starts at the instant given to [`MockClock::new`] and only moves when
/// told to via [`advance`](MockClock::advance) or [`set`](MockClock::set).
#[derive(Debug)]
pub struct MockClock {
    now: Mutex<Timestamp>,
}

impl MockClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: chrono::Duration) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now += duration;
    }

    /// Set the clock to an absolute instant.
    pub fn set(&self, to: Timestamp) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now = to;
    }
}

impl Clock for MockClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().expect("clock lock poisoned")
    }
}

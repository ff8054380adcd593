//! Clock abstraction for testable time handling.
//!
//! Every timing-sensitive subsystem (scheduler lease, outbound retry,
//! quiet-hours arithmetic) takes a `&impl Clock` rather than calling
//! `SystemTime::now()` directly, so tests can advance time deterministically.

use parking_lot::Mutex;
use std::sync::Arc;

/// A clock that provides the current time as epoch milliseconds.
pub trait Clock: Clone + Send + Sync + 'static {
    fn epoch_ms(&self) -> i64;
}

/// Real system clock.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_ms(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }
}

/// Fake clock for testing with controllable time.
#[derive(Clone)]
pub struct FakeClock {
    epoch_ms: Arc<Mutex<i64>>,
}

impl FakeClock {
    pub fn new(epoch_ms: i64) -> Self {
        Self { epoch_ms: Arc::new(Mutex::new(epoch_ms)) }
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance_ms(&self, ms: i64) {
        *self.epoch_ms.lock() += ms;
    }

    pub fn set_epoch_ms(&self, ms: i64) {
        *self.epoch_ms.lock() = ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(1_000_000)
    }
}

impl Clock for FakeClock {
    fn epoch_ms(&self) -> i64 {
        *self.epoch_ms.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;

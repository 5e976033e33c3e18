//! Monotonic time source.

use std::time::Instant;

/// Source of monotonic timestamps.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> Instant;
}

/// The system monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

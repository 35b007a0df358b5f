//! Monotonic tick source for debounce windows and cadence timing
//!
//! Millisecond ticks are carried in a `u32` that wraps, matching the
//! scheduler tick counter of the original firmware. Elapsed-time
//! checks must therefore go through [`ticks_elapsed`] (unsigned
//! difference), never direct comparison of two tick values.

use std::time::Instant;

pub trait Clock: Send + Sync {
    /// Wrapping millisecond tick counter
    fn now_ms(&self) -> u32;

    /// Fine-grained timestamp for echo pulse timing
    fn now_us(&self) -> u64;
}

/// Elapsed ticks between two wrapping tick readings
pub fn ticks_elapsed(now_ms: u32, since_ms: u32) -> u32 {
    now_ms.wrapping_sub(since_ms)
}

/// Process-lifetime monotonic clock backed by `Instant`
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u32 {
        self.epoch.elapsed().as_millis() as u32
    }

    fn now_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }
}

// src/engine/backoff.rs

use std::time::Duration;

/// Adaptive sleep between loop iterations.
///
/// Any dispatch snaps the interval back to `min`; an idle iteration doubles
/// it, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        let max = max.max(min);
        Self {
            min,
            max,
            current: min,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// Interval to sleep after an iteration that dispatched `dispatched`
    /// instances.
    pub fn next_sleep(&mut self, dispatched: usize) -> Duration {
        if dispatched > 0 {
            self.current = self.min;
        } else {
            self.current = self.current.saturating_mul(2).min(self.max);
        }
        self.current
    }
}

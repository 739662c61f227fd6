//! Exponential back-off schedule for retries.

use vitals_types::Duration;

/// Tracks exponential back-off state for a sequence of retries.
///
/// Each call to `next_wait` multiplies the wait by the configured factor,
/// capped at `max_wait`. With a factor below 1.0 the schedule would shrink,
/// so callers validate the factor in their config.
pub struct ExponentialBackoff {
    base_wait: Duration,
    max_wait: Duration,
    factor: f64,
    current_wait: Duration,
    attempts: u32,
}

impl ExponentialBackoff {
    pub fn new(base_wait: Duration, max_wait: Duration, factor: f64) -> Self {
        Self {
            base_wait,
            max_wait,
            factor,
            current_wait: base_wait.min(max_wait),
            attempts: 0,
        }
    }

    /// Return the wait before the next retry and advance the schedule.
    ///
    /// Increments the attempt counter.
    pub fn next_wait(&mut self) -> Duration {
        let wait = self.current_wait;
        self.current_wait = self.current_wait.mul_f64(self.factor).min(self.max_wait);
        self.attempts += 1;
        wait
    }

    /// Reset the wait to the base value (e.g. after a successful attempt).
    pub fn reset(&mut self) {
        self.current_wait = self.base_wait.min(self.max_wait);
    }

    /// Return how many waits have been handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

use crate::types::{BASE_RECONNECT_DELAY, MAX_RECONNECT_ATTEMPTS};
use std::time::Duration;

/// Bounded exponential backoff for reconnection.
///
/// The n-th scheduled attempt waits `base_delay * 2^(n-1)`. Once
/// `max_attempts` attempts have been handed out, [`next_delay`](Self::next_delay)
/// returns `None` until the counter is reset by a successful open.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    attempts: u32,
    max_attempts: u32,
    base_delay: Duration,
}

impl ReconnectBackoff {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            base_delay,
        }
    }

    /// Claim the next attempt and get its delay
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }

        self.attempts += 1;
        Some(self.delay_for(self.attempts))
    }

    /// Delay of the given 1-based attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Reset the counter (after a successful open)
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Spend the whole budget so no automatic attempt follows
    pub fn exhaust(&mut self) {
        self.attempts = self.max_attempts;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether automatic reconnection has given up
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(
            MAX_RECONNECT_ATTEMPTS,
            Duration::from_millis(BASE_RECONNECT_DELAY),
        )
    }
}

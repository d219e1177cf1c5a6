//! Reconnect backoff policy.
//!
//! Grounded on the reconnect loop in `EmbarkStudios/discord-sdk`'s IO task
//! (doubling-then-saturating delay between connect attempts), adapted to the
//! linear, bounded-in-100-failures curve this spec calls for.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Produces a monotone, bounded reconnect delay sequence.
///
/// `next_delay()` grows linearly with the number of consecutive failures and
/// saturates at `max_ms` once the curve would otherwise exceed it (by
/// failure 100, for the default bounds). `reset()` is called after a
/// successful handshake (READY) and brings the next delay back to `min_ms`.
#[derive(Debug)]
pub struct BackoffPolicy {
    min_ms: u64,
    max_ms: u64,
    failures: AtomicU32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(500, 60_000)
    }
}

impl BackoffPolicy {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        assert!(min_ms <= max_ms, "min_ms must not exceed max_ms");
        Self {
            min_ms,
            max_ms,
            failures: AtomicU32::new(0),
        }
    }

    /// Returns the delay to wait before the next connect attempt, and
    /// records one more failure.
    pub fn next_delay(&self) -> Duration {
        let prior_failures = self.failures.fetch_add(1, Ordering::SeqCst);
        let span = self.max_ms - self.min_ms;
        let step = span / 100;
        let delay_ms = self.min_ms.saturating_add(step.saturating_mul(u64::from(prior_failures)));
        Duration::from_millis(delay_ms.min(self.max_ms))
    }

    /// Resets the failure count so the next `next_delay()` call returns `min_ms` again.
    pub fn reset(&self) {
        self.failures.store(0, Ordering::SeqCst);
    }

    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_delay_is_min() {
        let backoff = BackoffPolicy::new(500, 60_000);
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
    }

    #[test]
    fn delay_grows_monotonically() {
        let backoff = BackoffPolicy::new(100, 1_000);
        let mut previous = backoff.next_delay();
        for _ in 0..20 {
            let next = backoff.next_delay();
            assert!(next >= previous);
            previous = next;
        }
    }

    #[test]
    fn saturates_at_max_within_bounded_failures() {
        let backoff = BackoffPolicy::new(500, 60_000);
        for _ in 0..100 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), Duration::from_millis(60_000));
        // stays saturated past that point
        for _ in 0..50 {
            assert_eq!(backoff.next_delay(), Duration::from_millis(60_000));
        }
    }

    #[test]
    fn never_below_min_or_above_max() {
        let backoff = BackoffPolicy::new(500, 60_000);
        for _ in 0..500 {
            let delay = backoff.next_delay();
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(60_000));
        }
    }

    #[test]
    fn reset_returns_to_min_and_zeroes_failures() {
        let backoff = BackoffPolicy::new(500, 60_000);
        for _ in 0..10 {
            backoff.next_delay();
        }
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
    }
}

//! Per-connection nonce generation.
//!
//! Every outbound frame carries a `nonce` field so responses can be matched
//! back to the request that produced them. This client emits a strictly
//! increasing 64-bit counter, starting at 1 for each engine worker instance:
//! it is cheap, trivially ordered, and never repeats across
//! reconnects within that instance's lifetime.

use std::sync::atomic::{AtomicU64, Ordering};

/// Generates decimal-string nonces from a monotonically increasing counter.
#[derive(Debug, Default)]
pub struct NonceGenerator {
    counter: AtomicU64,
}

impl NonceGenerator {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Returns the next nonce in the sequence, as a decimal string.
    pub fn next(&self) -> String {
        let value = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_one() {
        let generator = NonceGenerator::new();
        assert_eq!(generator.next(), "1");
    }

    #[test]
    fn strictly_increasing() {
        let generator = NonceGenerator::new();
        let a: u64 = generator.next().parse().unwrap();
        let b: u64 = generator.next().parse().unwrap();
        let c: u64 = generator.next().parse().unwrap();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn never_repeats_across_many_calls() {
        let generator = NonceGenerator::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(generator.next()));
        }
    }
}

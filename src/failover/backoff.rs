// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Exponential backoff between failover attempts.

use std::time::Duration;

/// Default base delay (1 second).
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default delay cap (5 seconds).
pub const DEFAULT_CAP_DELAY: Duration = Duration::from_millis(5000);

/// Capped exponential backoff: `delay(n) = min(base * 2^n, cap)`.
///
/// Pure and deterministic, so it can be tested without sleeping. The
/// orchestrator only consults it between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
}

impl BackoffPolicy {
    /// Create a policy with explicit base and cap.
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// A policy that never waits. Useful in tests.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn cap(&self) -> Duration {
        self.cap
    }

    /// Delay to wait after the zero-based attempt `attempt` fails.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base_ms = u64::try_from(self.base.as_millis()).unwrap_or(u64::MAX);
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(factor)).min(self.cap)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY, DEFAULT_CAP_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sequence() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_millis(1000));
        assert_eq!(policy.delay(1), Duration::from_millis(2000));
        assert_eq!(policy.delay(2), Duration::from_millis(4000));
        assert_eq!(policy.delay(3), Duration::from_millis(5000));
        assert_eq!(policy.delay(10), Duration::from_millis(5000));
    }

    #[test]
    fn test_matches_formula_and_is_monotonic() {
        let policy = BackoffPolicy::new(Duration::from_millis(250), Duration::from_millis(7000));
        let mut previous = Duration::ZERO;
        for n in 0..80u32 {
            let expected = if n < 63 {
                (250u64.saturating_mul(1u64 << n)).min(7000)
            } else {
                7000
            };
            let delay = policy.delay(n);
            assert_eq!(delay, Duration::from_millis(expected), "attempt {}", n);
            assert!(delay >= previous, "delay decreased at attempt {}", n);
            previous = delay;
        }
    }

    #[test]
    fn test_huge_attempt_index_saturates() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(u32::MAX), DEFAULT_CAP_DELAY);
    }

    #[test]
    fn test_base_above_cap() {
        let policy = BackoffPolicy::new(Duration::from_secs(10), Duration::from_secs(3));
        assert_eq!(policy.delay(0), Duration::from_secs(3));
    }

    #[test]
    fn test_none_never_waits() {
        let policy = BackoffPolicy::none();
        assert_eq!(policy.delay(0), Duration::ZERO);
        assert_eq!(policy.delay(5), Duration::ZERO);
    }
}

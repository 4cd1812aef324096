// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Cache entries and the clock used to age them.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;

/// Source of the current time in epoch milliseconds.
///
/// Injected into cache stores so expiry can be tested without sleeping.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now
            .fetch_add(duration_millis(by), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// A cached value with its creation time and time-to-live.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    pub fn new(key: impl Into<String>, value: V, created_at: i64, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            value,
            created_at,
            ttl,
        }
    }

    /// Age at `now`, clamped at zero for clock skew.
    pub fn age_millis(&self, now: i64) -> i64 {
        now.saturating_sub(self.created_at).max(0)
    }

    /// An entry aged exactly `ttl` is still valid.
    pub fn is_expired(&self, now: i64) -> bool {
        self.age_millis(now) > duration_millis(self.ttl)
    }
}

pub(crate) fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_boundary() {
        let entry = CacheEntry::new("pune", 1u8, 1_000, Duration::from_millis(600_000));
        assert!(!entry.is_expired(1_000 + 599_999));
        assert!(!entry.is_expired(1_000 + 600_000));
        assert!(entry.is_expired(1_000 + 600_001));
    }

    #[test]
    fn test_clock_skew_not_expired() {
        let entry = CacheEntry::new("k", (), 5_000, Duration::ZERO);
        assert_eq!(entry.age_millis(4_000), 0);
        assert!(!entry.is_expired(4_000));
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(10);
        clock.advance(Duration::from_secs(2));
        assert_eq!(clock.now_millis(), 2_010);
        clock.set(0);
        assert_eq!(clock.now_millis(), 0);
    }
}

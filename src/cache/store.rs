// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Two-tier cache store: bounded memory first, durable store behind it.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::durable::{DurableStore, StoredEntry};
use super::entry::{CacheEntry, Clock, SystemClock};
use super::memory::MemoryTier;
#[cfg(feature = "telemetry")]
use crate::telemetry::GLOBAL_METRICS;

/// TTL and capacity for one cache namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub ttl: Duration,
    /// Maximum entries held in memory.
    pub capacity: usize,
}

impl CacheSettings {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self { ttl, capacity }
    }
}

/// Point-in-time counters for one cache store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub namespace: String,
    pub memory_entries: usize,
    pub capacity: usize,
    /// `None` when there is no durable tier or it could not be read.
    pub durable_entries: Option<usize>,
    pub hits: u64,
    pub misses: u64,
    pub ttl_ms: u64,
}

impl CacheStats {
    /// Hit rate (0.0 to 1.0). Zero lookups count as 0.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Cache-aside store used by the weather gateway and the embedding cache.
///
/// Lookups check memory, then the durable tier; a durable hit backfills
/// memory with its original creation time. Writes go to both tiers, and a
/// durable write failure is logged and swallowed.
pub struct CacheStore<V> {
    namespace: String,
    settings: CacheSettings,
    memory: MemoryTier<V>,
    durable: Option<Arc<dyn DurableStore>>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    _value: PhantomData<fn() -> V>,
}

impl<V> CacheStore<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    /// Memory-only store on the wall clock.
    pub fn new(namespace: impl Into<String>, settings: CacheSettings) -> Self {
        Self {
            namespace: namespace.into(),
            settings,
            memory: MemoryTier::new(settings.capacity),
            durable: None,
            clock: Arc::new(SystemClock),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            _value: PhantomData,
        }
    }

    /// Attach a durable tier.
    pub fn with_durable(mut self, durable: Arc<dyn DurableStore>) -> Self {
        self.durable = Some(durable);
        self
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn ttl(&self) -> Duration {
        self.settings.ttl
    }

    pub fn has_durable(&self) -> bool {
        self.durable.is_some()
    }

    /// Look up a live value.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_entry(key).map(|entry| entry.value)
    }

    /// Look up a live entry, including its creation time.
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry<V>> {
        let now = self.clock.now_millis();

        let found = match self.memory.get(key, now) {
            Some(entry) => Some(entry),
            None => self.load_durable(key, now),
        };

        self.count_lookup(found.is_some());
        found
    }

    /// Store a value under `key`, replacing any previous entry.
    pub fn set(&self, key: &str, value: V) {
        let now = self.clock.now_millis();
        let entry = CacheEntry::new(key, value, now, self.settings.ttl);

        if let Some(durable) = &self.durable {
            match serde_json::to_string(&entry.value) {
                Ok(json) => {
                    let stored = StoredEntry {
                        key: key.to_string(),
                        value: json,
                        created_at: entry.created_at,
                        ttl: entry.ttl,
                    };
                    if let Err(e) = durable.save(&self.namespace, &stored) {
                        warn!(
                            namespace = %self.namespace,
                            key = %key,
                            error = %e,
                            "CacheWriteFailure: durable tier write failed, memory tier still populated"
                        );
                    }
                }
                Err(e) => {
                    warn!(namespace = %self.namespace, key = %key, error = %e, "CacheWriteFailure: value not serializable");
                }
            }
        }

        self.memory.insert(entry, now);
    }

    /// Remove `key` from both tiers.
    pub fn remove(&self, key: &str) {
        self.memory.remove(key);
        if let Some(durable) = &self.durable {
            if let Err(e) = durable.remove(&self.namespace, key) {
                warn!(namespace = %self.namespace, key = %key, error = %e, "Durable cache remove failed");
            }
        }
    }

    /// Drop expired entries from both tiers, returning the total removed.
    pub fn prune(&self) -> usize {
        let now = self.clock.now_millis();
        let mut removed = self.memory.prune(now);
        if let Some(durable) = &self.durable {
            match durable.prune(Some(&self.namespace), now) {
                Ok(n) => removed += n,
                Err(e) => warn!(namespace = %self.namespace, error = %e, "Durable cache prune failed"),
            }
        }
        removed
    }

    /// Empty both tiers.
    pub fn clear(&self) {
        self.memory.clear();
        if let Some(durable) = &self.durable {
            if let Err(e) = durable.clear(Some(&self.namespace)) {
                warn!(namespace = %self.namespace, error = %e, "Durable cache clear failed");
            }
        }
    }

    /// Number of entries in the memory tier.
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    pub fn stats(&self) -> CacheStats {
        let durable_entries = self
            .durable
            .as_ref()
            .and_then(|d| d.count(Some(&self.namespace)).ok());

        CacheStats {
            namespace: self.namespace.clone(),
            memory_entries: self.memory.len(),
            capacity: self.memory.capacity(),
            durable_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ttl_ms: u64::try_from(self.settings.ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }

    fn load_durable(&self, key: &str, now: i64) -> Option<CacheEntry<V>> {
        let durable = self.durable.as_ref()?;

        let stored = match durable.load(&self.namespace, key) {
            Ok(Some(stored)) => stored,
            Ok(None) => return None,
            Err(e) => {
                warn!(namespace = %self.namespace, key = %key, error = %e, "Durable cache read failed");
                return None;
            }
        };
        if stored.is_expired(now) {
            return None;
        }

        let value: V = match serde_json::from_str(&stored.value) {
            Ok(v) => v,
            Err(e) => {
                warn!(namespace = %self.namespace, key = %key, error = %e, "Discarding undecodable durable cache entry");
                return None;
            }
        };

        let entry = CacheEntry::new(key, value, stored.created_at, stored.ttl);
        self.memory.insert(entry.clone(), now);
        debug!(namespace = %self.namespace, key = %key, "Backfilled memory tier from durable store");
        Some(entry)
    }

    fn count_lookup(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_cache(&self.namespace, hit);
    }
}

impl<V> std::fmt::Debug for CacheStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("namespace", &self.namespace)
            .field("settings", &self.settings)
            .field("durable", &self.durable.is_some())
            .finish()
    }
}

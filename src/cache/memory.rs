// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Bounded in-process cache tier.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use super::entry::CacheEntry;

struct Slots<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Keys in insertion order, oldest first.
    order: VecDeque<String>,
}

/// Thread-safe map with TTL and insertion-order eviction.
///
/// Expired entries are dropped first when the tier is full; after that the
/// oldest insertion goes. Reads do not refresh position.
pub struct MemoryTier<V> {
    slots: RwLock<Slots<V>>,
    capacity: usize,
}

impl<V: Clone> MemoryTier<V> {
    /// Create a tier holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(Slots {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get a live entry.
    pub fn get(&self, key: &str, now: i64) -> Option<CacheEntry<V>> {
        let slots = self.slots.read().ok()?;
        slots
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .cloned()
    }

    /// Insert or replace an entry.
    pub fn insert(&self, entry: CacheEntry<V>, now: i64) {
        let mut slots = match self.slots.write() {
            Ok(s) => s,
            Err(_) => return,
        };

        if slots.entries.remove(&entry.key).is_some() {
            slots.order.retain(|k| k != &entry.key);
        }

        if slots.entries.len() >= self.capacity {
            Self::drop_expired(&mut slots, now);
        }
        while slots.entries.len() >= self.capacity {
            match slots.order.pop_front() {
                Some(oldest) => {
                    slots.entries.remove(&oldest);
                }
                None => break,
            }
        }

        slots.order.push_back(entry.key.clone());
        slots.entries.insert(entry.key.clone(), entry);
    }

    pub fn remove(&self, key: &str) -> bool {
        match self.slots.write() {
            Ok(mut slots) => {
                let removed = slots.entries.remove(key).is_some();
                if removed {
                    slots.order.retain(|k| k != key);
                }
                removed
            }
            Err(_) => false,
        }
    }

    /// Remove expired entries, returning how many were dropped.
    pub fn prune(&self, now: i64) -> usize {
        match self.slots.write() {
            Ok(mut slots) => Self::drop_expired(&mut slots, now),
            Err(_) => 0,
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slots) = self.slots.write() {
            slots.entries.clear();
            slots.order.clear();
        }
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.slots.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored keys, oldest first.
    pub fn keys(&self) -> Vec<String> {
        self.slots
            .read()
            .map(|s| s.order.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn drop_expired(slots: &mut Slots<V>, now: i64) -> usize {
        let before = slots.entries.len();
        slots.entries.retain(|_, entry| !entry.is_expired(now));
        let Slots { entries, order } = slots;
        order.retain(|k| entries.contains_key(k));
        before - entries.len()
    }
}

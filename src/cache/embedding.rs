// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Embedding cache keyed by (model, text).

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};

use super::durable::DurableStore;
use super::entry::Clock;
use super::store::{CacheSettings, CacheStats, CacheStore};
use crate::types::EmbeddingVector;

/// Namespace in the durable store.
pub const EMBEDDING_NAMESPACE: &str = "embedding";

/// Default TTL (7 days). Vectors for a fixed model never change.
pub const DEFAULT_EMBEDDING_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default in-memory capacity.
pub const DEFAULT_EMBEDDING_CAPACITY: usize = 10_000;

/// Two-tier cache of text embeddings.
#[derive(Debug)]
pub struct EmbeddingCache {
    store: CacheStore<EmbeddingVector>,
}

impl EmbeddingCache {
    /// Memory-only cache with default settings.
    pub fn new() -> Self {
        Self::with_settings(CacheSettings::new(
            DEFAULT_EMBEDDING_TTL,
            DEFAULT_EMBEDDING_CAPACITY,
        ))
    }

    pub fn with_settings(settings: CacheSettings) -> Self {
        Self {
            store: CacheStore::new(EMBEDDING_NAMESPACE, settings),
        }
    }

    /// Attach a durable tier.
    pub fn with_durable(self, durable: Arc<dyn DurableStore>) -> Self {
        Self {
            store: self.store.with_durable(durable),
        }
    }

    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: self.store.with_clock(clock),
        }
    }

    /// Derive the cache key for a (model, text) pair.
    ///
    /// Both parts are length-prefixed before hashing, so `("ab", "c")` and
    /// `("a", "bc")` get different keys.
    pub fn make_key(model: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update((model.len() as u64).to_le_bytes());
        hasher.update(model.as_bytes());
        hasher.update((text.len() as u64).to_le_bytes());
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, text: &str, model: &str) -> Option<EmbeddingVector> {
        self.store.get(&Self::make_key(model, text))
    }

    pub fn set(&self, text: &str, model: &str, vector: EmbeddingVector) {
        self.store.set(&Self::make_key(model, text), vector);
    }

    /// Look up many texts at once. The result is aligned with `texts`.
    pub fn batch_get(&self, texts: &[String], model: &str) -> Vec<Option<EmbeddingVector>> {
        texts.iter().map(|text| self.get(text, model)).collect()
    }

    /// Store many vectors at once. Extra texts or vectors are ignored.
    pub fn batch_set(&self, texts: &[String], model: &str, vectors: &[EmbeddingVector]) {
        for (text, vector) in texts.iter().zip(vectors) {
            self.set(text, model, vector.clone());
        }
    }

    pub fn prune(&self) -> usize {
        self.store.prune()
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::durable::SqliteStore;

    #[test]
    fn test_key_is_deterministic() {
        let a = EmbeddingCache::make_key("text-embedding-3-small", "hello world");
        let b = EmbeddingCache::make_key("text-embedding-3-small", "hello world");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_key_distinguishes_model_and_text() {
        let base = EmbeddingCache::make_key("m1", "rice advice");
        assert_ne!(base, EmbeddingCache::make_key("m2", "rice advice"));
        assert_ne!(base, EmbeddingCache::make_key("m1", "rice advice."));
        // Concatenation must not collide
        assert_ne!(
            EmbeddingCache::make_key("ab", "c"),
            EmbeddingCache::make_key("a", "bc")
        );
    }

    #[test]
    fn test_roundtrip() {
        let cache = EmbeddingCache::new();
        let vector = EmbeddingVector::new(vec![0.1, 0.2, 0.3]);
        cache.set("rice advice", "m1", vector.clone());

        assert_eq!(cache.get("rice advice", "m1"), Some(vector));
        assert!(cache.get("rice advice", "m2").is_none());
    }

    #[test]
    fn test_batch_alignment() {
        let cache = EmbeddingCache::new();
        let texts = vec!["wheat".to_string(), "maize".to_string(), "millet".to_string()];
        cache.batch_set(
            &texts[..2],
            "m1",
            &[EmbeddingVector::new(vec![1.0]), EmbeddingVector::new(vec![2.0])],
        );

        let got = cache.batch_get(&texts, "m1");
        assert_eq!(got.len(), 3);
        assert_eq!(got[1].as_ref().map(|v| v.values[0]), Some(2.0));
        assert!(got[2].is_none());
    }

    #[test]
    fn test_durable_tier_shared_between_instances() {
        let durable: Arc<dyn DurableStore> = Arc::new(SqliteStore::in_memory().unwrap());
        let first = EmbeddingCache::new().with_durable(durable.clone());
        first.set("soil ph", "m1", EmbeddingVector::new(vec![0.5, 0.5]));

        let second = EmbeddingCache::new().with_durable(durable);
        assert!(second.get("soil ph", "m1").is_some());
        assert_eq!(second.stats().durable_entries, Some(1));
        assert_eq!(second.stats().memory_entries, 1);
    }
}

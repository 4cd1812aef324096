// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Two-tier result caching.
//!
//! A [`CacheStore`] keeps a bounded in-process map in front of an optional
//! [`DurableStore`]. The weather gateway uses one directly; the
//! [`EmbeddingCache`] wraps one with (model, text) key derivation.

pub mod durable;
pub mod embedding;
pub mod entry;
pub mod memory;
pub mod store;

pub use durable::{default_cache_path, DurableStore, SqliteStore, StoredEntry};
pub use embedding::EmbeddingCache;
pub use entry::{CacheEntry, Clock, ManualClock, SystemClock};
pub use memory::MemoryTier;
pub use store::{CacheSettings, CacheStats, CacheStore};

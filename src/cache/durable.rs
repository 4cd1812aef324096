// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Durable cache tier backed by SQLite.
//!
//! Values are stored as JSON text so one table serves every cache namespace.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rusqlite::{params, Connection, OptionalExtension};

use super::entry::duration_millis;
use crate::error::CacheError;
#[cfg(feature = "telemetry")]
use crate::telemetry::GLOBAL_METRICS;

/// Schema version stored in the metadata table.
const CACHE_SCHEMA_VERSION: &str = "1";

/// A serialized entry as held by a durable store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub key: String,
    /// JSON-encoded value.
    pub value: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub ttl: Duration,
}

impl StoredEntry {
    pub fn is_expired(&self, now: i64) -> bool {
        now.saturating_sub(self.created_at) > duration_millis(self.ttl)
    }
}

/// Persistent key/value storage partitioned by namespace.
///
/// Calls are synchronous; implementations must be cheap enough to run on
/// the async request path.
pub trait DurableStore: Send + Sync {
    fn load(&self, namespace: &str, key: &str) -> Result<Option<StoredEntry>, CacheError>;

    fn save(&self, namespace: &str, entry: &StoredEntry) -> Result<(), CacheError>;

    fn remove(&self, namespace: &str, key: &str) -> Result<bool, CacheError>;

    /// Delete entries expired at `now`. `None` covers every namespace.
    fn prune(&self, namespace: Option<&str>, now: i64) -> Result<usize, CacheError>;

    /// Delete all entries. `None` covers every namespace.
    fn clear(&self, namespace: Option<&str>) -> Result<usize, CacheError>;

    fn count(&self, namespace: Option<&str>) -> Result<usize, CacheError>;
}

/// Default on-disk location: `~/.krishi/cache.db`.
pub fn default_cache_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".krishi").join("cache.db"))
}

/// SQLite implementation of [`DurableStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open or create a cache database at `path`.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        let start = Instant::now();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::OpenFailed(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| CacheError::OpenFailed(format!("{}: {}", path.display(), e)))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| CacheError::OpenFailed(format!("failed to set pragmas: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        };
        store.initialize_schema()?;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("cache.durable.open", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        Ok(store)
    }

    /// A private in-memory database. Contents vanish on drop.
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CacheError::OpenFailed(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
            path: None,
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Database path, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn initialize_schema(&self) -> Result<(), CacheError> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                ttl_ms INTEGER NOT NULL,
                PRIMARY KEY (namespace, key)
            );

            CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| CacheError::OpenFailed(format!("failed to create schema: {}", e)))?;

        conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES ('version', ?1)",
            params![CACHE_SCHEMA_VERSION],
        )
        .map_err(|e| CacheError::OpenFailed(format!("failed to set version: {}", e)))?;

        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CacheError> {
        self.conn
            .lock()
            .map_err(|_| CacheError::ReadFailed("cache connection lock poisoned".to_string()))
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").field("path", &self.path).finish()
    }
}

impl DurableStore for SqliteStore {
    fn load(&self, namespace: &str, key: &str) -> Result<Option<StoredEntry>, CacheError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT value, created_at, ttl_ms FROM cache_entries
                 WHERE namespace = ?1 AND key = ?2",
                params![namespace, key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.map(|(value, created_at, ttl_ms)| StoredEntry {
            key: key.to_string(),
            value,
            created_at,
            ttl: Duration::from_millis(u64::try_from(ttl_ms).unwrap_or(0)),
        }))
    }

    fn save(&self, namespace: &str, entry: &StoredEntry) -> Result<(), CacheError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO cache_entries (namespace, key, value, created_at, ttl_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                namespace,
                entry.key,
                entry.value,
                entry.created_at,
                duration_millis(entry.ttl)
            ],
        )
        .map_err(|e| CacheError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    fn remove(&self, namespace: &str, key: &str) -> Result<bool, CacheError> {
        let conn = self.lock()?;
        let deleted = conn
            .execute(
                "DELETE FROM cache_entries WHERE namespace = ?1 AND key = ?2",
                params![namespace, key],
            )
            .map_err(|e| CacheError::WriteFailed(e.to_string()))?;
        Ok(deleted > 0)
    }

    fn prune(&self, namespace: Option<&str>, now: i64) -> Result<usize, CacheError> {
        let conn = self.lock()?;
        let deleted = match namespace {
            Some(ns) => conn.execute(
                "DELETE FROM cache_entries WHERE namespace = ?1 AND ?2 - created_at > ttl_ms",
                params![ns, now],
            ),
            None => conn.execute(
                "DELETE FROM cache_entries WHERE ?1 - created_at > ttl_ms",
                params![now],
            ),
        }
        .map_err(|e| CacheError::WriteFailed(e.to_string()))?;
        Ok(deleted)
    }

    fn clear(&self, namespace: Option<&str>) -> Result<usize, CacheError> {
        let conn = self.lock()?;
        let deleted = match namespace {
            Some(ns) => conn.execute(
                "DELETE FROM cache_entries WHERE namespace = ?1",
                params![ns],
            ),
            None => conn.execute("DELETE FROM cache_entries", []),
        }
        .map_err(|e| CacheError::WriteFailed(e.to_string()))?;
        Ok(deleted)
    }

    fn count(&self, namespace: Option<&str>) -> Result<usize, CacheError> {
        let conn = self.lock()?;
        let count: i64 = match namespace {
            Some(ns) => conn.query_row(
                "SELECT COUNT(*) FROM cache_entries WHERE namespace = ?1",
                params![ns],
                |row| row.get(0),
            ),
            None => conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0)),
        }?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

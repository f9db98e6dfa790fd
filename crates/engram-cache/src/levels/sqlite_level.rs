//! Persistent level backed by SQLite. Entries survive process restarts.

use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection};
use serde_json::Value;

use engram_core::{EngramError, EngramResult};

use crate::level::CacheLevel;

fn to_cache_err(message: impl Into<String>) -> EngramError {
    EngramError::StoreUnavailable {
        store: "sqlite cache level".to_string(),
        reason: message.into(),
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// SQLite-backed cache tier. `key → JSON value` rows with optional expiry.
pub struct SqliteLevel {
    conn: Mutex<Connection>,
}

impl SqliteLevel {
    /// Open (or create) a cache file at the given path.
    pub fn open(path: &Path) -> EngramResult<Self> {
        let conn = Connection::open(path).map_err(|e| to_cache_err(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// In-memory variant for tests.
    pub fn open_in_memory() -> EngramResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| to_cache_err(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> EngramResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key         TEXT PRIMARY KEY,
                value       TEXT NOT NULL,
                expires_at  INTEGER,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| to_cache_err(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> EngramResult<T>
    where
        F: FnOnce(&Connection) -> EngramResult<T>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|e| to_cache_err(format!("lock poisoned: {e}")))?;
        f(&guard)
    }
}

impl CacheLevel for SqliteLevel {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn get(&self, key: &str) -> EngramResult<Option<Value>> {
        self.with_conn(|conn| {
            let row: Option<(String, Option<i64>)> = match conn.query_row(
                "SELECT value, expires_at FROM cache_entries WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            ) {
                Ok(v) => Some(v),
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(to_cache_err(e.to_string())),
            };

            let Some((text, expires_at)) = row else {
                return Ok(None);
            };
            if expires_at.is_some_and(|t| now_ms() >= t) {
                let _ = conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key]);
                return Ok(None);
            }
            serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| to_cache_err(format!("corrupt cache value for '{key}': {e}")))
        })
    }

    fn set(&self, key: &str, value: &Value, ttl: Option<Duration>) -> EngramResult<()> {
        let text = serde_json::to_string(value).map_err(|e| to_cache_err(e.to_string()))?;
        let expires_at = ttl.map(|d| now_ms() + d.as_millis() as i64);
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO cache_entries (key, value, expires_at) VALUES (?1, ?2, ?3)",
                params![key, text, expires_at],
            )
            .map_err(|e| to_cache_err(e.to_string()))?;
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> EngramResult<bool> {
        self.with_conn(|conn| {
            let affected = conn
                .execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
                .map_err(|e| to_cache_err(e.to_string()))?;
            Ok(affected > 0)
        })
    }

    fn has(&self, key: &str) -> EngramResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    fn clear(&self) -> EngramResult<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM cache_entries", [])
                .map_err(|e| to_cache_err(e.to_string()))?;
            Ok(())
        })
    }

    fn keys(&self) -> EngramResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT key FROM cache_entries WHERE expires_at IS NULL OR expires_at > ?1")
                .map_err(|e| to_cache_err(e.to_string()))?;
            let rows = stmt
                .query_map(params![now_ms()], |row| row.get::<_, String>(0))
                .map_err(|e| to_cache_err(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| to_cache_err(e.to_string()))
        })
    }

    fn size(&self) -> EngramResult<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE expires_at IS NULL OR expires_at > ?1",
                    params![now_ms()],
                    |row| row.get(0),
                )
                .map_err(|e| to_cache_err(e.to_string()))?;
            Ok(n as usize)
        })
    }
}

//! SQLite connection handling.
//!
//! File-backed databases get one writer plus a small ring of read-only
//! connections; WAL keeps the ring readable while the writer commits.
//! In-memory databases collapse to a single connection, because each
//! in-memory connection is its own isolated database.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OpenFlags};

use engram_core::EngramResult;

use crate::to_index_err;

/// Upper bound on the reader ring.
const MAX_READERS: usize = 8;

pub(crate) enum DbHandle {
    File {
        writer: Mutex<Connection>,
        readers: Vec<Mutex<Connection>>,
        cursor: AtomicUsize,
    },
    Memory {
        conn: Mutex<Connection>,
    },
}

impl DbHandle {
    /// Open a file-backed handle: the writer first (creating the file
    /// and entering WAL), then the read-only ring.
    pub fn open_file(path: &Path, reader_count: usize, busy_timeout_ms: u64) -> EngramResult<Self> {
        let writer = Connection::open(path).map_err(|e| to_index_err(e.to_string()))?;
        writer
            .execute_batch(&format!(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = {busy_timeout_ms};
                 PRAGMA foreign_keys = ON;"
            ))
            .map_err(|e| to_index_err(e.to_string()))?;

        let mut readers = Vec::with_capacity(reader_count.clamp(1, MAX_READERS));
        for _ in 0..reader_count.clamp(1, MAX_READERS) {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| to_index_err(e.to_string()))?;
            conn.execute_batch(&format!(
                "PRAGMA busy_timeout = {busy_timeout_ms};
                 PRAGMA foreign_keys = ON;"
            ))
            .map_err(|e| to_index_err(e.to_string()))?;
            readers.push(Mutex::new(conn));
        }

        Ok(Self::File {
            writer: Mutex::new(writer),
            readers,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Open an in-memory handle (tests and `:memory:` configs).
    pub fn open_memory() -> EngramResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| to_index_err(e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| to_index_err(e.to_string()))?;
        Ok(Self::Memory {
            conn: Mutex::new(conn),
        })
    }

    /// Run a statement batch or query through the write connection.
    /// This mutex is the serialized write queue.
    pub fn write<T, F>(&self, f: F) -> EngramResult<T>
    where
        F: FnOnce(&Connection) -> EngramResult<T>,
    {
        match self {
            Self::File { writer, .. } => {
                let guard = lock(writer)?;
                f(&guard)
            }
            Self::Memory { conn } => {
                let guard = lock(conn)?;
                f(&guard)
            }
        }
    }

    /// Run a read-only query. File handles rotate through the ring;
    /// memory handles share the single connection.
    pub fn read<T, F>(&self, f: F) -> EngramResult<T>
    where
        F: FnOnce(&Connection) -> EngramResult<T>,
    {
        match self {
            Self::File {
                readers, cursor, ..
            } => {
                let slot = cursor.fetch_add(1, Ordering::Relaxed) % readers.len();
                let guard = lock(&readers[slot])?;
                f(&guard)
            }
            Self::Memory { conn } => {
                let guard = lock(conn)?;
                f(&guard)
            }
        }
    }

    /// Number of read connections behind this handle.
    pub fn reader_count(&self) -> usize {
        match self {
            Self::File { readers, .. } => readers.len(),
            Self::Memory { .. } => 1,
        }
    }
}

fn lock(mutex: &Mutex<Connection>) -> EngramResult<MutexGuard<'_, Connection>> {
    mutex
        .lock()
        .map_err(|e| to_index_err(format!("connection lock poisoned: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_handle_reads_its_own_writes() {
        let db = DbHandle::open_memory().unwrap();
        db.write(|conn| {
            conn.execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (7);")
                .map_err(|e| to_index_err(e.to_string()))
        })
        .unwrap();
        let v: i64 = db
            .read(|conn| {
                conn.query_row("SELECT v FROM t", [], |row| row.get(0))
                    .map_err(|e| to_index_err(e.to_string()))
            })
            .unwrap();
        assert_eq!(v, 7);
    }

    #[test]
    fn file_handle_ring_sees_committed_writes() {
        let dir = tempfile::tempdir().unwrap();
        let db = DbHandle::open_file(&dir.path().join("ring.db"), 3, 5_000).unwrap();
        assert_eq!(db.reader_count(), 3);

        db.write(|conn| {
            conn.execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (1);")
                .map_err(|e| to_index_err(e.to_string()))
        })
        .unwrap();

        // Rotate past every reader; each must see the committed row.
        for _ in 0..6 {
            let count: i64 = db
                .read(|conn| {
                    conn.query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
                        .map_err(|e| to_index_err(e.to_string()))
                })
                .unwrap();
            assert_eq!(count, 1);
        }
    }

    #[test]
    fn reader_count_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let db = DbHandle::open_file(&dir.path().join("clamp.db"), 99, 5_000).unwrap();
        assert!(db.reader_count() <= MAX_READERS);
        let db = DbHandle::open_file(&dir.path().join("zero.db"), 0, 5_000).unwrap();
        assert_eq!(db.reader_count(), 1);
    }
}

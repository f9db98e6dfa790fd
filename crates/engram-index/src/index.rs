//! RelationalIndex — owns the database handle and exposes the table ops.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use engram_core::{EngramError, EngramResult, Event, QueryFilters, Session};

use crate::connection::DbHandle;
use crate::migrations;
use crate::queries;
use crate::queries::git_ops::GitState;
use crate::queries::stats::IndexStatistics;
use crate::transaction::{with_transaction, TxContext};

/// The relational index. Single writer, rotating readers.
pub struct RelationalIndex {
    db: DbHandle,
    closed: AtomicBool,
}

impl RelationalIndex {
    /// Open an index backed by a file on disk.
    pub fn open(path: &Path, read_pool_size: usize, busy_timeout_ms: u64) -> EngramResult<Self> {
        let db = DbHandle::open_file(path, read_pool_size, busy_timeout_ms)?;
        let index = Self {
            db,
            closed: AtomicBool::new(false),
        };
        index.initialize()?;
        Ok(index)
    }

    /// Open an in-memory index (for testing and `:memory:` configs).
    pub fn open_in_memory() -> EngramResult<Self> {
        let db = DbHandle::open_memory()?;
        let index = Self {
            db,
            closed: AtomicBool::new(false),
        };
        index.initialize()?;
        Ok(index)
    }

    /// Run migrations.
    fn initialize(&self) -> EngramResult<()> {
        self.db.write(migrations::run_migrations)
    }

    fn ensure_open(&self) -> EngramResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EngramError::Closed);
        }
        Ok(())
    }

    fn with_reader<F, T>(&self, f: F) -> EngramResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> EngramResult<T>,
    {
        self.ensure_open()?;
        self.db.read(f)
    }

    fn with_writer<F, T>(&self, f: F) -> EngramResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> EngramResult<T>,
    {
        self.ensure_open()?;
        self.db.write(f)
    }

    // ── event rows ─────────────────────────────────────────────────────

    pub fn insert_memory(&self, event: &Event) -> EngramResult<()> {
        self.with_writer(|conn| queries::event_crud::insert_event(conn, event))
    }

    /// Single transaction; any constraint violation rolls back the batch.
    pub fn insert_memories_batch(&self, events: &[Event]) -> EngramResult<usize> {
        self.with_writer(|conn| queries::event_crud::bulk_insert(conn, events))
    }

    pub fn get_by_id(&self, id: &str) -> EngramResult<Option<Event>> {
        self.with_reader(|conn| queries::event_crud::get_event(conn, id))
    }

    /// Preserves the order of the input id list.
    pub fn get_by_ids(&self, ids: &[String]) -> EngramResult<Vec<Event>> {
        self.with_reader(|conn| queries::event_crud::bulk_get(conn, ids))
    }

    pub fn filter(&self, filters: &QueryFilters) -> EngramResult<Vec<Event>> {
        self.with_reader(|conn| queries::event_filter::filter_events(conn, filters))
    }

    pub fn count(&self, table: &str) -> EngramResult<usize> {
        self.with_reader(|conn| queries::event_filter::count(conn, table))
    }

    /// Run a closure inside a write transaction.
    pub fn transaction<T, F>(&self, f: F) -> EngramResult<T>
    where
        F: FnOnce(&TxContext<'_>) -> EngramResult<T>,
    {
        self.with_writer(|conn| with_transaction(conn, f))
    }

    // ── sessions ───────────────────────────────────────────────────────

    pub fn upsert_session(&self, session: &Session) -> EngramResult<()> {
        self.with_writer(|conn| queries::session_ops::upsert_session(conn, session))
    }

    pub fn get_session(&self, id: &str) -> EngramResult<Option<Session>> {
        self.with_reader(|conn| queries::session_ops::get_session(conn, id))
    }

    pub fn active_sessions(&self) -> EngramResult<Vec<Session>> {
        self.with_reader(|conn| queries::session_ops::active_sessions(conn))
    }

    // ── git state ──────────────────────────────────────────────────────

    pub fn record_git_state(&self, state: &GitState) -> EngramResult<()> {
        self.with_writer(|conn| queries::git_ops::record_git_state(conn, state))
    }

    pub fn latest_git_state(
        &self,
        workspace_id: &str,
        branch: &str,
    ) -> EngramResult<Option<GitState>> {
        self.with_reader(|conn| queries::git_ops::latest_git_state(conn, workspace_id, branch))
    }

    // ── vector mappings ────────────────────────────────────────────────

    pub fn upsert_vector_mapping(
        &self,
        memory_id: &str,
        vector_id: &str,
        model: &str,
        content_hash: &str,
    ) -> EngramResult<()> {
        self.with_writer(|conn| {
            queries::mapping_ops::upsert_mapping(conn, memory_id, vector_id, model, content_hash)
        })
    }

    /// Vector already indexed for identical content, if any.
    pub fn vector_id_for_content_hash(
        &self,
        content_hash: &str,
        model: &str,
    ) -> EngramResult<Option<String>> {
        self.with_reader(|conn| {
            queries::mapping_ops::vector_id_for_content_hash(conn, content_hash, model)
        })
    }

    /// Order-preserving; unmapped slots are `None`.
    pub fn memory_ids_for_vectors(
        &self,
        vector_ids: &[String],
    ) -> EngramResult<Vec<Option<String>>> {
        self.with_reader(|conn| queries::mapping_ops::memory_ids_for_vectors(conn, vector_ids))
    }

    pub fn vector_id_for_memory(&self, memory_id: &str) -> EngramResult<Option<String>> {
        self.with_reader(|conn| queries::mapping_ops::vector_id_for_memory(conn, memory_id))
    }

    // ── aggregates ─────────────────────────────────────────────────────

    pub fn statistics(&self) -> EngramResult<IndexStatistics> {
        self.with_reader(queries::stats::collect)
    }

    /// Mark the index closed. Idempotent; later operations return `Closed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

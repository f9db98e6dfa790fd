//! VectorIndex — dimension-fixed store with filtered cosine search.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use rayon::prelude::*;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use engram_core::{EngramError, EngramResult};

use crate::document::{validate_vector, VectorDocument};
use crate::persistence;
use crate::scoring::{cosine_similarity, matches_filter};
use crate::to_vector_err;

/// Index construction options.
#[derive(Debug, Clone, Default)]
pub struct VectorIndexConfig {
    /// When true, invalid members of `add_batch` are reported in `errors`
    /// and the valid remainder is committed. When false the whole batch
    /// fails on the first invalid member.
    pub allow_partial_batch: bool,
    /// Directory holding the index image and metadata files.
    pub persist_dir: Option<PathBuf>,
}

/// One search hit. `score` is cosine similarity, descending.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub score: f64,
    pub vector: Option<Vec<f32>>,
    pub metadata: Map<String, Value>,
}

/// Search parameters.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub k: usize,
    /// Equality AND-map over metadata keys.
    pub filter: Option<Map<String, Value>>,
    /// Hits scoring below this are pruned.
    pub threshold: Option<f64>,
    /// Include the stored vector in each hit.
    pub include_vector: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            k: 10,
            filter: None,
            threshold: None,
            include_vector: false,
        }
    }
}

/// Per-member failure reported by a partial batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchError {
    pub id: String,
    pub reason: String,
}

/// Outcome of `add_batch`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchAddResult {
    pub inserted: Vec<String>,
    pub errors: Vec<BatchError>,
}

/// Outcome of `upsert_batch`, partitioned by pre-existence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertResult {
    pub updated: Vec<String>,
    pub inserted: Vec<String>,
}

/// Outcome of `delete_batch`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteBatchResult {
    pub deleted: Vec<String>,
    pub not_found: Vec<String>,
}

struct State {
    /// Fixed at the first successful insertion; one-way transition.
    dimension: Option<usize>,
    docs: HashMap<String, VectorDocument>,
}

/// The vector index. Single writer with reader snapshots; persist never
/// observes a torn state.
pub struct VectorIndex {
    state: RwLock<State>,
    /// Serializes concurrent persist/load calls.
    persist_lock: Mutex<()>,
    config: VectorIndexConfig,
    closed: AtomicBool,
}

impl VectorIndex {
    pub fn new(config: VectorIndexConfig) -> Self {
        Self {
            state: RwLock::new(State {
                dimension: None,
                docs: HashMap::new(),
            }),
            persist_lock: Mutex::new(()),
            config,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> EngramResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EngramError::Closed);
        }
        Ok(())
    }

    fn read_state(&self) -> EngramResult<std::sync::RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|e| to_vector_err(format!("state lock poisoned: {e}")))
    }

    fn write_state(&self) -> EngramResult<std::sync::RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|e| to_vector_err(format!("state lock poisoned: {e}")))
    }

    /// The fixed dimension, once set.
    pub fn dimension(&self) -> Option<usize> {
        self.state.read().ok().and_then(|s| s.dimension)
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── mutation ───────────────────────────────────────────────────────

    /// Insert (or replace) a single document.
    pub fn add(&self, doc: VectorDocument) -> EngramResult<()> {
        self.ensure_open()?;
        let mut state = self.write_state()?;
        validate_vector(&doc.id, &doc.vector, state.dimension)?;
        if state.dimension.is_none() {
            state.dimension = Some(doc.vector.len());
        }
        state.docs.insert(doc.id.clone(), doc);
        Ok(())
    }

    /// Insert a batch. Without `allow_partial_batch`, any invalid member
    /// fails the whole batch and nothing is committed.
    pub fn add_batch(&self, docs: Vec<VectorDocument>) -> EngramResult<BatchAddResult> {
        self.ensure_open()?;
        let mut state = self.write_state()?;

        // Infer the dimension from the first structurally valid member
        // when the index is still empty.
        let mut dimension = state.dimension;
        if dimension.is_none() {
            dimension = docs
                .iter()
                .find(|d| validate_vector(&d.id, &d.vector, None).is_ok())
                .map(|d| d.vector.len());
        }

        let mut valid = Vec::with_capacity(docs.len());
        let mut errors = Vec::new();
        for doc in docs {
            match validate_vector(&doc.id, &doc.vector, dimension) {
                Ok(()) => valid.push(doc),
                Err(e) => {
                    if !self.config.allow_partial_batch {
                        return Err(e);
                    }
                    errors.push(BatchError {
                        id: doc.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let mut inserted = Vec::with_capacity(valid.len());
        for doc in valid {
            inserted.push(doc.id.clone());
            state.docs.insert(doc.id.clone(), doc);
        }
        if !inserted.is_empty() && state.dimension.is_none() {
            state.dimension = dimension;
        }
        Ok(BatchAddResult { inserted, errors })
    }

    /// Insert-or-replace a batch, reporting which ids pre-existed.
    /// Validation is atomic: any invalid member fails the whole call.
    pub fn upsert_batch(&self, docs: Vec<VectorDocument>) -> EngramResult<UpsertResult> {
        self.ensure_open()?;
        let mut state = self.write_state()?;

        let mut dimension = state.dimension;
        if dimension.is_none() {
            dimension = docs.first().map(|d| d.vector.len());
        }
        for doc in &docs {
            validate_vector(&doc.id, &doc.vector, dimension)?;
        }

        let mut result = UpsertResult::default();
        for doc in docs {
            if state.docs.contains_key(&doc.id) {
                result.updated.push(doc.id.clone());
            } else {
                result.inserted.push(doc.id.clone());
            }
            state.docs.insert(doc.id.clone(), doc);
        }
        if state.dimension.is_none() {
            state.dimension = dimension;
        }
        Ok(result)
    }

    // ── retrieval ──────────────────────────────────────────────────────

    pub fn get(&self, id: &str) -> EngramResult<Option<VectorDocument>> {
        self.ensure_open()?;
        Ok(self.read_state()?.docs.get(id).cloned())
    }

    /// Found documents in input order; missing ids are skipped.
    pub fn get_batch(&self, ids: &[String]) -> EngramResult<Vec<VectorDocument>> {
        self.ensure_open()?;
        let state = self.read_state()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.docs.get(id).cloned())
            .collect())
    }

    /// Filter scan with pagination, ordered by id for determinism.
    pub fn get_by_filter(
        &self,
        filter: &Map<String, Value>,
        offset: usize,
        limit: Option<usize>,
    ) -> EngramResult<Vec<VectorDocument>> {
        self.ensure_open()?;
        let state = self.read_state()?;
        let mut matched: Vec<&VectorDocument> = state
            .docs
            .values()
            .filter(|d| matches_filter(&d.metadata, filter))
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        let out: Vec<VectorDocument> = matched
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(out)
    }

    /// Filtered cosine search, descending by score, truncated to `k`.
    pub fn search(&self, query: &[f32], options: &SearchOptions) -> EngramResult<Vec<SearchResult>> {
        self.ensure_open()?;
        let state = self.read_state()?;
        validate_vector("query", query, state.dimension)?;
        Ok(Self::search_locked(&state, query, options))
    }

    /// One result list per query; validation is shared across the batch.
    pub fn search_batch(
        &self,
        queries: &[(Vec<f32>, SearchOptions)],
    ) -> EngramResult<Vec<Vec<SearchResult>>> {
        self.ensure_open()?;
        let state = self.read_state()?;
        for (query, _) in queries {
            validate_vector("query", query, state.dimension)?;
        }
        Ok(queries
            .par_iter()
            .map(|(query, options)| Self::search_locked(&state, query, options))
            .collect())
    }

    fn search_locked(state: &State, query: &[f32], options: &SearchOptions) -> Vec<SearchResult> {
        let empty = Map::new();
        let filter = options.filter.as_ref().unwrap_or(&empty);

        let mut hits: Vec<SearchResult> = state
            .docs
            .par_iter()
            .filter(|(_, doc)| filter.is_empty() || matches_filter(&doc.metadata, filter))
            .map(|(id, doc)| SearchResult {
                id: id.clone(),
                score: cosine_similarity(query, &doc.vector),
                vector: options.include_vector.then(|| doc.vector.clone()),
                metadata: doc.metadata.clone(),
            })
            .collect();

        if let Some(threshold) = options.threshold {
            hits.retain(|h| h.score >= threshold);
        }
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(options.k);
        hits
    }

    // ── deletion ───────────────────────────────────────────────────────

    /// Remove a document. Returns whether it existed.
    pub fn delete(&self, id: &str) -> EngramResult<bool> {
        self.ensure_open()?;
        Ok(self.write_state()?.docs.remove(id).is_some())
    }

    /// Remove a batch atomically under one write lock.
    pub fn delete_batch(&self, ids: &[String]) -> EngramResult<DeleteBatchResult> {
        self.ensure_open()?;
        let mut state = self.write_state()?;
        let mut result = DeleteBatchResult::default();
        for id in ids {
            if state.docs.remove(id).is_some() {
                result.deleted.push(id.clone());
            } else {
                result.not_found.push(id.clone());
            }
        }
        Ok(result)
    }

    /// Remove every document matching the filter.
    pub fn delete_by_filter(&self, filter: &Map<String, Value>) -> EngramResult<usize> {
        self.ensure_open()?;
        let mut state = self.write_state()?;
        let victims: Vec<String> = state
            .docs
            .values()
            .filter(|d| matches_filter(&d.metadata, filter))
            .map(|d| d.id.clone())
            .collect();
        for id in &victims {
            state.docs.remove(id);
        }
        Ok(victims.len())
    }

    // ── persistence ────────────────────────────────────────────────────

    /// Write the index image and metadata file. Concurrent calls
    /// serialize; each write goes through a temp file and rename.
    pub fn persist(&self) -> EngramResult<()> {
        self.ensure_open()?;
        self.persist_inner()
    }

    fn persist_inner(&self) -> EngramResult<()> {
        let dir = self
            .config
            .persist_dir
            .as_ref()
            .ok_or_else(|| EngramError::validation("persist_dir", "not configured"))?;

        let _guard = self
            .persist_lock
            .lock()
            .map_err(|e| to_vector_err(format!("persist lock poisoned: {e}")))?;

        // Snapshot under the read lock, write outside it.
        let (dimension, docs) = {
            let state = self.read_state()?;
            (state.dimension, state.docs.values().cloned().collect::<Vec<_>>())
        };
        persistence::write_snapshot(dir, dimension, &docs)?;
        debug!(count = docs.len(), dir = %dir.display(), "vector index persisted");
        Ok(())
    }

    /// Reinitialize from disk. Missing files leave the index empty;
    /// corrupt metadata is an error.
    pub fn load(&self) -> EngramResult<()> {
        self.ensure_open()?;
        let dir = self
            .config
            .persist_dir
            .as_ref()
            .ok_or_else(|| EngramError::validation("persist_dir", "not configured"))?;

        let _guard = self
            .persist_lock
            .lock()
            .map_err(|e| to_vector_err(format!("persist lock poisoned: {e}")))?;

        let snapshot = persistence::read_snapshot(dir)?;
        let mut state = self.write_state()?;
        state.dimension = snapshot.dimension;
        state.docs = snapshot
            .docs
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();
        debug!(count = state.docs.len(), "vector index loaded");
        Ok(())
    }

    /// Best-effort final persist, then mark closed. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.config.persist_dir.is_some() {
            if let Err(e) = self.persist_inner() {
                warn!(error = %e, "final vector persist failed");
            }
        }
    }
}

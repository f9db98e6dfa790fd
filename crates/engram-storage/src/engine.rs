//! StorageEngine — validated capture, semantic/structured query,
//! statistics, ordered shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use engram_cache::MultiLevelCache;
use engram_core::constants::{BLOB_SPILL_THRESHOLD, CONTENT_PREFIX_CHARS};
use engram_core::{EngramConfig, EngramError, EngramResult, Event, NewEvent, QueryFilters};
use engram_index::queries::stats::IndexStatistics;
use engram_index::RelationalIndex;
use engram_vector::{SearchOptions, VectorDocument, VectorIndex, VectorIndexConfig};

use crate::blob::BlobStore;

/// Embedding callback: deterministic per (model, text); output treated
/// opaquely by the engine.
pub type Embedder = Arc<dyn Fn(&str) -> EngramResult<Vec<f32>> + Send + Sync>;

/// The storage engine facade.
pub struct StorageEngine {
    index: Arc<RelationalIndex>,
    vector: Option<Arc<VectorIndex>>,
    embedder: Option<Embedder>,
    blob: BlobStore,
    cache: Option<Arc<MultiLevelCache>>,
    max_memory_size: usize,
    model_name: String,
    closed: AtomicBool,
}

impl StorageEngine {
    /// Open the engine from config. The vector path activates only when
    /// both a vector directory and an embedder are supplied; a corrupt
    /// vector snapshot degrades to an empty vector index with a warning.
    pub fn open(config: &EngramConfig, embedder: Option<Embedder>) -> EngramResult<Self> {
        let index = if config.is_in_memory() {
            Arc::new(RelationalIndex::open_in_memory()?)
        } else {
            Arc::new(RelationalIndex::open(
                std::path::Path::new(&config.db_path),
                config.read_pool_size,
                config.busy_timeout_ms,
            )?)
        };

        let vector = match &config.vector_dir {
            Some(dir) => {
                let vector = VectorIndex::new(VectorIndexConfig {
                    allow_partial_batch: false,
                    persist_dir: Some(dir.clone()),
                });
                if let Err(e) = vector.load() {
                    warn!(error = %e, "vector snapshot unusable, starting empty");
                }
                Some(Arc::new(vector))
            }
            None => None,
        };

        let blob = BlobStore::open(config.blob_root.clone())?;
        let max_memory_size = config.max_memory_size_bytes()?;

        Ok(Self {
            index,
            vector,
            embedder,
            blob,
            cache: None,
            max_memory_size,
            model_name: "default".to_string(),
            closed: AtomicBool::new(false),
        })
    }

    /// Attach a read-through event cache.
    pub fn with_cache(mut self, cache: Arc<MultiLevelCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Name the embedding model recorded in vector mappings.
    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    fn ensure_open(&self) -> EngramResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EngramError::Closed);
        }
        Ok(())
    }

    /// The relational index handle, shared with the session manager.
    pub fn index(&self) -> Arc<RelationalIndex> {
        self.index.clone()
    }

    // ── capture ────────────────────────────────────────────────────────

    /// Validate, assign an id, insert the authoritative row, then run the
    /// best-effort side writes (vector, blob, cache).
    pub async fn capture(&self, new_event: NewEvent) -> EngramResult<Event> {
        self.ensure_open()?;
        self.validate(&new_event)?;

        let event = Event::assign_id(new_event);
        self.index.insert_memory(&event)?;

        // Side writes never fail the capture; the row is authoritative.
        if event.is_embeddable() {
            if let Err(e) = self.index_vector(&event) {
                warn!(memory_id = %event.id, error = %e, "vector side-write failed");
            }
        }
        if event.content.len() > BLOB_SPILL_THRESHOLD {
            if let Err(e) = self.blob.write(&event.id, event.content.as_bytes()) {
                warn!(memory_id = %event.id, error = %e, "blob side-write failed");
            }
        }
        if let Some(cache) = &self.cache {
            if let Ok(value) = serde_json::to_value(&event) {
                cache.set(event.id.clone(), value, None).await;
            }
        }

        debug!(memory_id = %event.id, event_type = %event.event_type, "event captured");
        Ok(event)
    }

    fn validate(&self, event: &NewEvent) -> EngramResult<()> {
        if event.content.is_empty() {
            return Err(EngramError::validation("content", "must not be empty"));
        }
        if event.session_id.trim().is_empty() {
            return Err(EngramError::validation("session_id", "must not be empty"));
        }
        let size = serde_json::to_vec(event).map(|b| b.len()).unwrap_or(0);
        if size > self.max_memory_size {
            return Err(EngramError::SizeLimit {
                size,
                max: self.max_memory_size,
            });
        }
        Ok(())
    }

    /// Embed and insert into the vector index, then record the mapping.
    /// Content already indexed under the same model shares its stored
    /// vector; only the mapping row is added.
    fn index_vector(&self, event: &Event) -> EngramResult<()> {
        let (Some(vector), Some(embedder)) = (&self.vector, &self.embedder) else {
            return Ok(());
        };

        let content_hash = event.content_hash();
        if let Some(existing) = self
            .index
            .vector_id_for_content_hash(&content_hash, &self.model_name)?
        {
            debug!(memory_id = %event.id, vector_id = %existing, "vector deduped by content hash");
            self.index
                .upsert_vector_mapping(&event.id, &existing, &self.model_name, &content_hash)?;
            return Ok(());
        }

        let embedding = embedder(&event.content)?;
        let vector_id = format!("vec_{}", Uuid::now_v7());

        let mut metadata = Map::new();
        metadata.insert("id".to_string(), json!(event.id));
        metadata.insert("event_type".to_string(), json!(event.event_type.as_str()));
        metadata.insert("session_id".to_string(), json!(event.session_id));
        metadata.insert("content_hash".to_string(), json!(content_hash));
        let prefix: String = event.content.chars().take(CONTENT_PREFIX_CHARS).collect();
        metadata.insert("content_prefix".to_string(), json!(prefix));
        if let Some(workspace_id) = &event.workspace_id {
            metadata.insert("workspace_id".to_string(), json!(workspace_id));
        }
        if let Some(git_branch) = &event.git_branch {
            metadata.insert("git_branch".to_string(), json!(git_branch));
        }

        vector.add(VectorDocument {
            id: vector_id.clone(),
            vector: embedding,
            metadata,
        })?;
        self.index
            .upsert_vector_mapping(&event.id, &vector_id, &self.model_name, &content_hash)?;
        Ok(())
    }

    // ── query ──────────────────────────────────────────────────────────

    /// Semantic retrieval when a query text and the vector path are
    /// available, otherwise (and on any vector-path failure) the filtered
    /// relational query. Backing-store failures degrade to empty.
    pub async fn query(&self, filters: &QueryFilters) -> EngramResult<Vec<Event>> {
        self.ensure_open()?;

        if filters.wants_semantic() && self.vector.is_some() && self.embedder.is_some() {
            match self.semantic_query(filters) {
                Ok(events) if !events.is_empty() => return Ok(events),
                Ok(_) => {
                    debug!("semantic path found nothing, falling back to structured");
                }
                Err(e) => {
                    warn!(error = %e, "semantic path failed, falling back to structured");
                }
            }
        }

        match self.index.filter(filters) {
            Ok(events) => Ok(events),
            Err(e) => {
                warn!(error = %e, "structured query failed, returning empty");
                Ok(Vec::new())
            }
        }
    }

    /// Embed → search → resolve vector ids to event ids → fetch rows,
    /// preserving the search order.
    fn semantic_query(&self, filters: &QueryFilters) -> EngramResult<Vec<Event>> {
        let (Some(vector), Some(embedder), Some(query_text)) = (
            &self.vector,
            &self.embedder,
            filters.semantic_query.as_deref(),
        ) else {
            return Err(EngramError::internal("semantic path unavailable"));
        };

        let embedding = embedder(query_text)?;
        let options = SearchOptions {
            k: filters.limit.unwrap_or(10),
            filter: Some(Self::metadata_filter(filters)),
            ..Default::default()
        };
        let hits = vector.search(&embedding, &options)?;
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        // The mapping table is the authoritative resolver; metadata ids
        // cover rows predating a mapping. Unresolvable hits are skipped.
        let vector_ids: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
        let mapped = self.index.memory_ids_for_vectors(&vector_ids)?;

        let mut memory_ids = Vec::with_capacity(hits.len());
        for (hit, mapped_id) in hits.iter().zip(mapped) {
            let resolved = mapped_id.or_else(|| {
                hit.metadata
                    .get("id")
                    .or_else(|| hit.metadata.get("memory_id"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
            match resolved {
                Some(id) => memory_ids.push(id),
                None => warn!(vector_id = %hit.id, "unresolvable vector id skipped"),
            }
        }

        self.index.get_by_ids(&memory_ids)
    }

    /// Project the query filters onto vector metadata keys.
    fn metadata_filter(filters: &QueryFilters) -> Map<String, Value> {
        let mut filter = Map::new();
        if let Some(workspace_id) = &filters.workspace_id {
            filter.insert("workspace_id".to_string(), json!(workspace_id));
        }
        if let Some(session_id) = &filters.session_id {
            filter.insert("session_id".to_string(), json!(session_id));
        }
        if let Some(event_type) = filters.event_type {
            filter.insert("event_type".to_string(), json!(event_type.as_str()));
        }
        if let Some(git_branch) = &filters.git_branch {
            filter.insert("git_branch".to_string(), json!(git_branch));
        }
        filter
    }

    /// Cached single-event lookup (read-through when a cache is attached).
    pub async fn get(&self, id: &str) -> EngramResult<Option<Event>> {
        self.ensure_open()?;

        if let Some(cache) = &self.cache {
            if let Some(value) = cache.get(id).await {
                if let Ok(event) = serde_json::from_value::<Event>(value) {
                    return Ok(Some(event));
                }
            }
        }

        let event = self.index.get_by_id(id)?;
        if let (Some(cache), Some(event)) = (&self.cache, &event) {
            if let Ok(value) = serde_json::to_value(event) {
                cache.set(id.to_string(), value, None).await;
            }
        }
        Ok(event)
    }

    /// Read a spilled blob copy of an event's content.
    pub fn read_blob(&self, id: &str) -> EngramResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        self.blob.read(id)
    }

    // ── aggregates & shutdown ──────────────────────────────────────────

    pub fn statistics(&self) -> EngramResult<IndexStatistics> {
        self.ensure_open()?;
        self.index.statistics()
    }

    /// Close the relational index, the vector index, then the blob store,
    /// in that order. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.index.close();
        if let Some(vector) = &self.vector {
            vector.close();
        }
        // The blob store holds no open handles.
        debug!("storage engine closed");
    }
}

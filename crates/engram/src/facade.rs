//! Engram — composition of engine, sessions, limiter, builder, monitor.

use std::sync::Arc;

use tracing::{debug, info};

use engram_cache::MultiLevelCache;
use engram_context::{ContextBuilder, ContextOptions, RetrievedMemory};
use engram_core::validate::validate_prompt;
use engram_core::{EngramConfig, EngramError, EngramResult, Event, EventType, NewEvent, QueryFilters};
use engram_limiter::RateLimiter;
use engram_monitor::ResourceMonitor;
use engram_session::SessionManager;
use engram_storage::{Embedder, StorageEngine};

use crate::responses::{CapturedEvent, ContextInjection};

/// Default number of memories retrieved for a context block.
const DEFAULT_RECALL_LIMIT: usize = 10;

/// The assembled system. Construction starts the session cleanup task
/// and the resource monitor; `shutdown` stops both and closes the
/// stores. Must be created inside a tokio runtime.
pub struct Engram {
    engine: Arc<StorageEngine>,
    sessions: Arc<SessionManager>,
    limiter: RateLimiter,
    builder: ContextBuilder,
    monitor: ResourceMonitor,
    cache: Arc<MultiLevelCache>,
}

impl Engram {
    /// Wire the subsystems from one config.
    pub fn open(config: EngramConfig, embedder: Option<Embedder>) -> EngramResult<Self> {
        let cache = Arc::new(MultiLevelCache::new(&config.cache));
        let engine = Arc::new(
            StorageEngine::open(&config, embedder)?.with_cache(cache.clone()),
        );
        let sessions = Arc::new(SessionManager::new(
            config.session.clone(),
            Some(engine.index()),
        )?);
        let limiter = RateLimiter::new(config.limiter.clone())?;
        let builder = ContextBuilder::new(ContextOptions::default());

        let monitor = ResourceMonitor::new(config.monitor.clone())?;
        // EMERGENCY pressure sheds the cheapest memory first: the cache.
        let emergency_cache = cache.clone();
        monitor.register_cleanup_handler(Arc::new(move |analysis| {
            let cache = emergency_cache.clone();
            Box::pin(async move {
                info!(level = ?analysis.overall, "pressure cleanup: clearing cache");
                cache.clear().await;
            })
        }));
        monitor.start();

        info!("engram system started");
        Ok(Self {
            engine,
            sessions,
            limiter,
            builder,
            monitor,
            cache,
        })
    }

    fn admit(&self, key: &str) -> EngramResult<()> {
        let decision = self.limiter.check(key);
        if decision.allowed {
            return Ok(());
        }
        Err(EngramError::RateLimited {
            retry_after_secs: decision.retry_after_secs.unwrap_or(1),
        })
    }

    /// Retrieve relevant memories for a prompt and assemble the bounded
    /// context block, stamped with the workspace's session.
    pub async fn inject_context(
        &self,
        workspace_id: &str,
        prompt: &str,
        session_id: Option<&str>,
    ) -> EngramResult<ContextInjection> {
        self.admit(workspace_id)?;
        validate_prompt(prompt)?;

        let session = self.sessions.get_or_create(workspace_id, session_id);
        let filters = QueryFilters {
            workspace_id: Some(workspace_id.to_string()),
            semantic_query: Some(prompt.to_string()),
            limit: Some(DEFAULT_RECALL_LIMIT),
            ..Default::default()
        };
        let events = self.engine.query(&filters).await?;
        let memory_count = events.len();

        let retrieved = rank_for_context(events);
        let context = self.builder.build(&retrieved);
        debug!(
            workspace_id,
            session_id = %session.id,
            memory_count,
            context_bytes = context.len(),
            "context injected"
        );

        Ok(ContextInjection {
            kind: "context".to_string(),
            workspace_id: workspace_id.to_string(),
            session_id: session.id,
            memory_count,
            context,
        })
    }

    /// Capture one observation event under the workspace's session.
    pub async fn capture_event(
        &self,
        workspace_id: &str,
        event_type: EventType,
        content: &str,
        metadata: Option<serde_json::Value>,
        session_id: Option<&str>,
    ) -> EngramResult<CapturedEvent> {
        self.admit(workspace_id)?;

        let session = self.sessions.get_or_create(workspace_id, session_id);
        let mut new_event = NewEvent::new(event_type, content, session.id.clone());
        new_event.workspace_id = Some(workspace_id.to_string());
        if let Some(metadata) = metadata {
            new_event.metadata = metadata;
        }

        let event = self.engine.capture(new_event).await?;
        Ok(CapturedEvent {
            kind: "captured".to_string(),
            memory_id: event.id,
            workspace_id: workspace_id.to_string(),
            session_id: session.id,
        })
    }

    pub fn engine(&self) -> &StorageEngine {
        &self.engine
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn monitor(&self) -> &ResourceMonitor {
        &self.monitor
    }

    pub fn cache(&self) -> &MultiLevelCache {
        &self.cache
    }

    /// Stop background tasks and close the stores. Idempotent.
    pub fn shutdown(&self) {
        self.monitor.stop();
        self.sessions.close();
        self.engine.close();
        info!("engram system stopped");
    }
}

/// Convert retrieved events into builder inputs. Events arrive already
/// ordered by relevance (or timestamp on the structured path), so rank
/// position becomes the score.
fn rank_for_context(events: Vec<Event>) -> Vec<RetrievedMemory> {
    let total = events.len();
    events
        .into_iter()
        .enumerate()
        .map(|(i, event)| RetrievedMemory {
            id: event.id,
            content: event.content,
            score: (total - i) as f64 / total.max(1) as f64,
            timestamp: Some(event.timestamp),
            event_type: Some(event.event_type.as_str().to_string()),
            metadata: event.metadata,
        })
        .collect()
}

//! SessionManager — concurrent per-workspace session tracking via DashMap.

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::Duration;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use engram_core::config::SessionConfig;
use engram_core::{EngramResult, Session};
use engram_index::RelationalIndex;

use crate::id::generate_session_id;

/// Thread-safe session manager. One active session per workspace;
/// concurrent `get_or_create` calls converge on a single id.
pub struct SessionManager {
    sessions: Arc<DashMap<String, Session>>,
    /// workspace_id → active session id. The entry lock is what makes
    /// `get_or_create` race-free.
    workspace_index: Arc<DashMap<String, String>>,
    config: SessionConfig,
    store: Option<Arc<RelationalIndex>>,
    cleanup_task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    /// Create a manager, rehydrate persisted active sessions, and start
    /// the periodic cleanup task. Must be called within a tokio runtime.
    pub fn new(config: SessionConfig, store: Option<Arc<RelationalIndex>>) -> EngramResult<Self> {
        let manager = Self {
            sessions: Arc::new(DashMap::new()),
            workspace_index: Arc::new(DashMap::new()),
            config,
            store,
            cleanup_task: Mutex::new(None),
        };
        manager.rehydrate()?;
        manager.start_cleanup_task();
        Ok(manager)
    }

    fn idle_timeout(&self) -> Duration {
        Duration::seconds(self.config.session_timeout_secs as i64)
    }

    fn rehydrate(&self) -> EngramResult<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let timeout = self.idle_timeout();
        for session in store.active_sessions()? {
            if session.is_live(timeout) {
                self.workspace_index
                    .insert(session.workspace_id.clone(), session.id.clone());
                self.sessions.insert(session.id.clone(), session);
            }
        }
        debug!(count = self.sessions.len(), "sessions rehydrated");
        Ok(())
    }

    fn start_cleanup_task(&self) {
        let sessions = self.sessions.clone();
        let workspace_index = self.workspace_index.clone();
        let store = self.store.clone();
        let timeout = self.idle_timeout();
        let interval = StdDuration::from_secs(self.config.cleanup_interval_secs.max(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // skip the immediate tick
            loop {
                ticker.tick().await;
                cleanup_expired(&sessions, &workspace_index, store.as_deref(), timeout);
            }
        });
        if let Ok(mut task) = self.cleanup_task.lock() {
            *task = Some(handle);
        }
    }

    fn mirror(&self, session: &Session) {
        if let Some(store) = &self.store {
            if let Err(e) = store.upsert_session(session) {
                warn!(session_id = %session.id, error = %e, "session mirror failed");
            }
        }
    }

    /// Create a new session for a workspace. When the cap on concurrent
    /// sessions is reached, the idlest active session is ended first.
    pub fn create(&self, workspace_id: &str, metadata: Option<serde_json::Value>) -> Session {
        self.enforce_cap();

        let mut session = Session::new(generate_session_id(), workspace_id);
        if let Some(metadata) = metadata {
            session.metadata = metadata;
        }
        self.workspace_index
            .insert(workspace_id.to_string(), session.id.clone());
        self.sessions.insert(session.id.clone(), session.clone());
        self.mirror(&session);
        session
    }

    fn enforce_cap(&self) {
        let timeout = self.idle_timeout();
        let live: Vec<Session> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_live(timeout))
            .map(|entry| entry.value().clone())
            .collect();
        if live.len() < self.config.max_active_sessions.max(1) {
            return;
        }
        if let Some(idlest) = live.into_iter().min_by_key(|s| s.last_activity) {
            debug!(session_id = %idlest.id, "session cap reached, ending idlest");
            self.end(&idlest.id);
        }
    }

    /// Get a session by id. Unknown or expired sessions yield `None`.
    pub fn get(&self, session_id: &str) -> Option<Session> {
        let timeout = self.idle_timeout();
        self.sessions
            .get(session_id)
            .filter(|entry| entry.value().is_live(timeout))
            .map(|entry| entry.value().clone())
    }

    /// Reuse the given session when it belongs to the workspace and is
    /// still live (refreshing its activity clock); otherwise converge on
    /// one session per workspace, creating it if needed.
    pub fn get_or_create(&self, workspace_id: &str, session_id: Option<&str>) -> Session {
        let timeout = self.idle_timeout();

        if let Some(id) = session_id {
            if let Some(mut entry) = self.sessions.get_mut(id) {
                if entry.workspace_id == workspace_id && entry.is_live(timeout) {
                    entry.touch();
                    let session = entry.clone();
                    drop(entry);
                    self.mirror(&session);
                    return session;
                }
            }
        }

        // The workspace entry lock serializes concurrent callers.
        match self.workspace_index.entry(workspace_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get().clone();
                if let Some(mut entry) = self.sessions.get_mut(&existing) {
                    if entry.is_live(timeout) {
                        entry.touch();
                        let session = entry.clone();
                        drop(entry);
                        self.mirror(&session);
                        return session;
                    }
                }
                // Stale pointer: replace with a fresh session.
                let session = Session::new(generate_session_id(), workspace_id);
                occupied.insert(session.id.clone());
                self.sessions.insert(session.id.clone(), session.clone());
                self.mirror(&session);
                session
            }
            Entry::Vacant(vacant) => {
                let session = Session::new(generate_session_id(), workspace_id);
                vacant.insert(session.id.clone());
                self.sessions.insert(session.id.clone(), session.clone());
                self.mirror(&session);
                session
            }
        }
    }

    /// The live session for a workspace, if any.
    pub fn find_active(&self, workspace_id: &str) -> Option<Session> {
        let id = self.workspace_index.get(workspace_id)?.clone();
        self.get(&id)
    }

    /// End a session. Returns whether it existed and was active.
    pub fn end(&self, session_id: &str) -> bool {
        let Some(mut entry) = self.sessions.get_mut(session_id) else {
            return false;
        };
        if !entry.is_active {
            return false;
        }
        entry.end();
        let session = entry.clone();
        drop(entry);

        self.workspace_index
            .remove_if(&session.workspace_id, |_, v| v.as_str() == session_id);
        self.mirror(&session);
        true
    }

    /// All currently live sessions.
    pub fn get_active(&self) -> Vec<Session> {
        let timeout = self.idle_timeout();
        self.sessions
            .iter()
            .filter(|entry| entry.value().is_live(timeout))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Expire idle sessions now. Returns how many were ended.
    pub fn cleanup_inactive(&self) -> usize {
        cleanup_expired(
            &self.sessions,
            &self.workspace_index,
            self.store.as_deref(),
            self.idle_timeout(),
        )
    }

    /// Total tracked sessions, live or ended.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Stop the periodic cleanup task. Idempotent.
    pub fn close(&self) {
        if let Ok(mut task) = self.cleanup_task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}

/// Shared by the periodic task and `cleanup_inactive`.
fn cleanup_expired(
    sessions: &DashMap<String, Session>,
    workspace_index: &DashMap<String, String>,
    store: Option<&RelationalIndex>,
    timeout: Duration,
) -> usize {
    let expired: Vec<String> = sessions
        .iter()
        .filter(|entry| entry.value().is_active && !entry.value().is_live(timeout))
        .map(|entry| entry.key().clone())
        .collect();

    let mut count = 0;
    for id in &expired {
        let Some(mut entry) = sessions.get_mut(id) else {
            continue;
        };
        entry.end();
        let session = entry.clone();
        drop(entry);

        workspace_index.remove_if(&session.workspace_id, |_, v| v == id);
        if let Some(store) = store {
            if let Err(e) = store.upsert_session(&session) {
                warn!(session_id = %id, error = %e, "expired session mirror failed");
            }
        }
        // Ended sessions stay queryable in the store; drop them from the
        // in-memory map.
        sessions.remove(id);
        count += 1;
    }
    if count > 0 {
        debug!(count, "expired sessions cleaned up");
    }
    count
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.close();
    }
}

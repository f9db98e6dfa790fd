//! Session model: workspace-scoped conversational state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A tracked session. Mutated only by the session manager via
/// `last_activity` refreshes and the terminal `end_time` assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub workspace_id: String,
    pub start_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Session {
    /// Create a fresh active session.
    pub fn new(id: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            workspace_id: workspace_id.into(),
            start_time: now,
            last_activity: now,
            end_time: None,
            is_active: true,
            metadata: serde_json::json!({}),
        }
    }

    /// Refresh the activity clock.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Active means the flag is set and the idle window has not elapsed.
    pub fn is_live(&self, idle_timeout: Duration) -> bool {
        self.is_active && Utc::now() - self.last_activity < idle_timeout
    }

    /// Duration since last activity.
    pub fn idle_duration(&self) -> Duration {
        Utc::now() - self.last_activity
    }

    /// Mark the session ended.
    pub fn end(&mut self) {
        self.is_active = false;
        self.end_time = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_live() {
        let s = Session::new("session_1_abc", "ws");
        assert!(s.is_live(Duration::minutes(30)));
    }

    #[test]
    fn ended_session_is_not_live() {
        let mut s = Session::new("session_1_abc", "ws");
        s.end();
        assert!(!s.is_live(Duration::minutes(30)));
        assert!(s.end_time.is_some());
    }

    #[test]
    fn stale_session_is_not_live() {
        let mut s = Session::new("session_1_abc", "ws");
        s.last_activity = Utc::now() - Duration::hours(2);
        assert!(!s.is_live(Duration::minutes(30)));
    }
}

//! Query filter types shared by the relational index and the storage engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::EventType;

/// Column to order structured query results by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    #[default]
    Timestamp,
    CreatedAt,
    EventType,
}

impl OrderBy {
    /// The column name, safe for direct SQL interpolation (closed set).
    pub fn column(&self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::CreatedAt => "created_at",
            Self::EventType => "event_type",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filters accepted by `query`. All fields optional; an empty filter
/// matches everything (bounded by `limit`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryFilters {
    pub workspace_id: Option<String>,
    pub session_id: Option<String>,
    pub event_type: Option<EventType>,
    pub git_branch: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub order_by: Option<OrderBy>,
    pub order_direction: Option<OrderDirection>,
    /// When set (and the vector path is available), retrieval is semantic.
    pub semantic_query: Option<String>,
}

impl QueryFilters {
    /// Filter scoped to a session.
    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Default::default()
        }
    }

    /// Filter scoped to a workspace.
    pub fn for_workspace(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: Some(workspace_id.into()),
            ..Default::default()
        }
    }

    /// Whether the semantic path should be attempted.
    pub fn wants_semantic(&self) -> bool {
        self.semantic_query
            .as_deref()
            .map(|q| !q.trim().is_empty())
            .unwrap_or(false)
    }
}

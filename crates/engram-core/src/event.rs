//! The event model. An event (a.k.a. memory) is the atomic unit of capture.
//!
//! Events are immutable after capture — there is no update path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::EMBEDDABLE_MIN_CONTENT_CHARS;

/// Small enumerated tag that drives indexing and rendering policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    UserPrompt,
    AssistantResponse,
    FileWrite,
    CodeWrite,
    CommandRun,
    ToolUse,
    Documentation,
    Comment,
    GitCommit,
    TestRun,
}

impl EventType {
    /// The snake_case wire name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserPrompt => "user_prompt",
            Self::AssistantResponse => "assistant_response",
            Self::FileWrite => "file_write",
            Self::CodeWrite => "code_write",
            Self::CommandRun => "command_run",
            Self::ToolUse => "tool_use",
            Self::Documentation => "documentation",
            Self::Comment => "comment",
            Self::GitCommit => "git_commit",
            Self::TestRun => "test_run",
        }
    }

    /// Whether this type participates in vector indexing.
    pub fn is_embeddable(&self) -> bool {
        matches!(
            self,
            Self::FileWrite | Self::CodeWrite | Self::Documentation | Self::Comment
        )
    }

    /// All known types, for statistics iteration.
    pub fn all() -> &'static [EventType] {
        &[
            Self::UserPrompt,
            Self::AssistantResponse,
            Self::FileWrite,
            Self::CodeWrite,
            Self::CommandRun,
            Self::ToolUse,
            Self::Documentation,
            Self::Comment,
            Self::GitCommit,
            Self::TestRun,
        ]
    }
}

impl std::str::FromStr for EventType {
    type Err = crate::EngramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::all()
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| crate::EngramError::validation("event_type", format!("unknown type '{s}'")))
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A captured event. `id` is a time-ordered UUID assigned at capture,
/// so id order is also capture order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub event_type: EventType,
    pub content: String,
    /// Optional JSON-shaped metadata. Keys are never reserved.
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
}

/// Capture input: an event without its identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub event_type: EventType,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub git_branch: Option<String>,
    #[serde(default)]
    pub git_commit: Option<String>,
}

impl NewEvent {
    /// Minimal constructor; metadata defaults to an empty object.
    pub fn new(
        event_type: EventType,
        content: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            content: content.into(),
            metadata: serde_json::json!({}),
            timestamp: Utc::now(),
            session_id: session_id.into(),
            workspace_id: None,
            git_branch: None,
            git_commit: None,
        }
    }
}

impl Event {
    /// Mint a time-sortable identifier and promote a `NewEvent`.
    pub fn assign_id(new: NewEvent) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            event_type: new.event_type,
            content: new.content,
            metadata: new.metadata,
            timestamp: new.timestamp,
            session_id: new.session_id,
            workspace_id: new.workspace_id,
            git_branch: new.git_branch,
            git_commit: new.git_commit,
        }
    }

    /// Whether this event gets a vector: embeddable type and content
    /// longer than the minimum character count.
    pub fn is_embeddable(&self) -> bool {
        self.event_type.is_embeddable()
            && self.content.chars().count() > EMBEDDABLE_MIN_CONTENT_CHARS
    }

    /// blake3 hash of the content, keying embedding dedup.
    pub fn content_hash(&self) -> String {
        blake3::hash(self.content.as_bytes()).to_hex().to_string()
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

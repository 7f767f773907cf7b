//! Conversation memory: per-session, append-only turn logs.
//!
//! A session is keyed by the caller's user identifier (or the anonymous
//! fallback token). It is created lazily on the first appended turn and is
//! never destroyed. Turns are appended in chronological order and never
//! mutated afterwards.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// Session token used when no verified identity is available.
pub const ANONYMOUS_SESSION: &str = "anonymous";

/// Unique identifier for a conversation session (the caller's user id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Session for a verified identity, falling back to the anonymous token.
    pub fn for_identity(identity: Option<&str>) -> Self {
        match identity.map(str::trim) {
            Some(id) if !id.is_empty() => Self(id.to_string()),
            _ => Self::anonymous(),
        }
    }

    pub fn anonymous() -> Self {
        Self(ANONYMOUS_SESSION.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(TurnRole::User),
            "assistant" => Some(TurnRole::Assistant),
            _ => None,
        }
    }
}

/// One message in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Durable or volatile storage for session turn logs.
///
/// Implementations must tolerate concurrent use across distinct sessions
/// without cross-session interference.
///
/// Implementations: SQLite, JSONL files, in-memory.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "file", "in_memory").
    fn name(&self) -> &str;

    /// Append a turn to the end of the session's log.
    async fn append(&self, session: &SessionId, turn: Turn) -> Result<(), MemoryError>;

    /// Load the session's turns in chronological order. Unknown sessions
    /// load as empty.
    async fn load(&self, session: &SessionId) -> Result<Vec<Turn>, MemoryError>;

    /// Can the backend currently serve requests?
    async fn health_check(&self) -> Result<(), MemoryError> {
        Ok(())
    }
}

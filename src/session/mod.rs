//! Conversation sessions and the store that owns them.
//!
//! Each session sits behind its own [`tokio::sync::Mutex`], so queries in one
//! session run one at a time while other sessions proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::llm::{Message, MessageRole};
use crate::routing::IntentMode;

/// One entry of a conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// `user` or `assistant`.
    pub role: MessageRole,
    /// Turn text.
    pub content: String,
    /// When the turn was recorded.
    pub timestamp: DateTime<Utc>,
}

/// A conversation: history plus the intent mode in effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    /// Unique session identifier.
    pub id: String,
    /// Ordered turns.
    pub history: Vec<ChatTurn>,
    /// Intent mode used for the next query.
    pub last_mode: IntentMode,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

/// Fresh random session id.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

impl ConversationSession {
    /// Create an empty session
    pub fn new(id: impl Into<String>, mode: IntentMode) -> Self {
        Self {
            id: id.into(),
            history: Vec::new(),
            last_mode: mode,
            created_at: Utc::now(),
        }
    }

    /// Create an empty session with a generated id
    pub fn generated(mode: IntentMode) -> Self {
        Self::new(new_session_id(), mode)
    }

    /// Record a completed exchange.
    pub fn append_exchange(&mut self, query: impl Into<String>, answer: impl Into<String>) {
        let now = Utc::now();
        self.history.push(ChatTurn {
            role: MessageRole::User,
            content: query.into(),
            timestamp: now,
        });
        self.history.push(ChatTurn {
            role: MessageRole::Assistant,
            content: answer.into(),
            timestamp: now,
        });
    }

    /// History as chat messages for prompt rendering
    pub fn messages(&self) -> Vec<Message> {
        self.history
            .iter()
            .map(|turn| Message {
                role: turn.role,
                content: turn.content.clone(),
            })
            .collect()
    }

    /// Drop the history, keeping id and mode.
    pub fn clear(&mut self) {
        self.history.clear();
    }
}

/// Shared, individually locked session.
pub type SessionHandle = Arc<Mutex<ConversationSession>>;

/// Owner of all conversation sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up a session.
    async fn get(&self, id: &str) -> Option<SessionHandle>;

    /// Look up a session, creating it with `mode` on first reference.
    async fn get_or_create(&self, id: &str, mode: IntentMode) -> SessionHandle;

    /// Clear a session's history. Returns whether the session existed.
    async fn clear(&self, id: &str) -> bool;

    /// Remove a session. Returns whether the session existed.
    async fn delete(&self, id: &str) -> bool;

    /// Ids of all live sessions, sorted.
    async fn session_ids(&self) -> Vec<String>;
}

/// Process-lifetime session store.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl InMemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    async fn get_or_create(&self, id: &str, mode: IntentMode) -> SessionHandle {
        if let Some(handle) = self.get(id).await {
            return handle;
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                info!(session_id = %id, mode = %mode, "Session created");
                Arc::new(Mutex::new(ConversationSession::new(id, mode)))
            })
            .clone()
    }

    async fn clear(&self, id: &str) -> bool {
        let Some(handle) = self.get(id).await else {
            return false;
        };
        let mut session = handle.lock().await;
        debug!(session_id = %id, turns = session.history.len(), "Session cleared");
        session.clear();
        true
    }

    async fn delete(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!(session_id = %id, "Session deleted");
        }
        removed
    }

    async fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

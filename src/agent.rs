//! Conversation facade: session commands, routing and dispatch for one
//! line of user input.

use std::sync::Arc;

use tracing::{debug, info};

use crate::dispatch::{DispatchOutcome, ResponseDispatcher, ResponseSink};
use crate::error::AppResult;
use crate::routing::{IntentMode, IntentOrchestrator, RouteDecision};
use crate::session::{ChatTurn, SessionStore};

/// Words that end the conversation loop.
pub const EXIT_COMMANDS: &[&str] = &["exit", "quit", "退出", "bye", "再见"];

/// Words that reset the session history.
pub const CLEAR_COMMANDS: &[&str] = &["clear", "重置", "reset"];

/// Control input recognised before routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Stop the loop.
    Exit,
    /// Reset the session history.
    Clear,
    /// Switch the session's intent mode.
    SetMode(IntentMode),
}

impl Command {
    /// Parse a whole input line; `None` means it is an ordinary query.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim().to_lowercase();

        if EXIT_COMMANDS.contains(&input.as_str()) {
            return Some(Command::Exit);
        }
        if CLEAR_COMMANDS.contains(&input.as_str()) {
            return Some(Command::Clear);
        }

        let mut words = input.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some("mode"), Some(mode), None) => mode.parse().ok().map(Command::SetMode),
            _ => None,
        }
    }
}

/// What handling one input line produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Blank input; nothing happened.
    Empty,
    /// The caller should stop.
    Exit,
    /// The session history was reset.
    Cleared,
    /// The session now uses this mode.
    ModeChanged(IntentMode),
    /// A query was routed and answered.
    Answered {
        /// Routing decision.
        decision: RouteDecision,
        /// Dispatch result.
        outcome: DispatchOutcome,
    },
}

/// Routes and answers queries for any number of sessions.
#[derive(Clone)]
pub struct Agent {
    orchestrator: IntentOrchestrator,
    dispatcher: ResponseDispatcher,
    sessions: Arc<dyn SessionStore>,
    default_mode: IntentMode,
}

impl Agent {
    /// Create an agent
    pub fn new(
        orchestrator: IntentOrchestrator,
        dispatcher: ResponseDispatcher,
        sessions: Arc<dyn SessionStore>,
        default_mode: IntentMode,
    ) -> Self {
        Self {
            orchestrator,
            dispatcher,
            sessions,
            default_mode,
        }
    }

    /// Mode given to sessions on creation
    pub fn default_mode(&self) -> IntentMode {
        self.default_mode
    }

    /// The session store
    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Route a query for a session without answering it.
    pub async fn route(&self, session_id: &str, query: &str) -> RouteDecision {
        let handle = self.sessions.get_or_create(session_id, self.default_mode).await;
        let mode = handle.lock().await.last_mode;
        self.orchestrator.decide(query, mode).await
    }

    /// Handle one line of input for `session_id`.
    ///
    /// The session stays locked for the whole query, so queries within one
    /// session never interleave.
    ///
    /// # Errors
    /// Returns the chat backend error when the answer could not be produced.
    pub async fn handle_input(
        &self,
        session_id: &str,
        input: &str,
        sink: &mut dyn ResponseSink,
    ) -> AppResult<Reply> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Reply::Empty);
        }

        match Command::parse(input) {
            Some(Command::Exit) => return Ok(Reply::Exit),
            Some(Command::Clear) => {
                self.sessions.get_or_create(session_id, self.default_mode).await;
                self.sessions.clear(session_id).await;
                info!(session_id = %session_id, "Conversation reset");
                return Ok(Reply::Cleared);
            }
            Some(Command::SetMode(mode)) => {
                let handle = self.sessions.get_or_create(session_id, self.default_mode).await;
                handle.lock().await.last_mode = mode;
                info!(session_id = %session_id, mode = %mode, "Intent mode changed");
                return Ok(Reply::ModeChanged(mode));
            }
            None => {}
        }

        let handle = self.sessions.get_or_create(session_id, self.default_mode).await;
        let mut session = handle.lock().await;

        debug!(session_id = %session_id, mode = %session.last_mode, "Handling query");
        let decision = self.orchestrator.decide(input, session.last_mode).await;
        let outcome = self
            .dispatcher
            .dispatch(&decision, input, &mut session, sink)
            .await?;

        Ok(Reply::Answered { decision, outcome })
    }

    /// Current history of a session, empty if it does not exist.
    pub async fn history(&self, session_id: &str) -> Vec<ChatTurn> {
        match self.sessions.get(session_id).await {
            Some(handle) => handle.lock().await.history.clone(),
            None => Vec::new(),
        }
    }
}

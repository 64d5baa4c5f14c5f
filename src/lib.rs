//! # Intent Router
//!
//! The decision layer of a retrieval-augmented chat assistant. Every query is
//! routed to exactly one of three paths:
//!
//! - **General**: plain conversation with the chat model
//! - **Knowledge**: retrieval over a pre-built vector index, then a grounded answer
//! - **Tool**: keyword-scored tool selection, regex parameter extraction and an
//!   HTTP call to the tool backend, optionally wrapped up by the chat model
//!
//! Knowledge classification runs on keyword tables (rule mode) or on an LLM
//! classifier that falls back to the tables on any failure (llm mode).
//!
//! ## Architecture
//!
//! ```text
//! query → IntentOrchestrator ─┬─ tool gate → selector → extractor ──→ TOOL
//!                             └─ rule / LLM knowledge check ────────→ KNOWLEDGE | GENERAL
//!                                          ↓
//!                              ResponseDispatcher → ResponseSink (streamed tokens)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use intent_router::routing::{IntentMode, IntentOrchestrator};
//! use intent_router::tools::ToolRegistry;
//!
//! #[tokio::main]
//! async fn main() {
//!     let orchestrator = IntentOrchestrator::new(Arc::new(ToolRegistry::new()));
//!     let decision = orchestrator.decide("2+3*4", IntentMode::Rule).await;
//!     assert_eq!(decision.route.kind(), "tool");
//! }
//! ```

#![warn(missing_docs)]

/// Conversation facade: commands, routing and dispatch per session.
pub mod agent;
/// Configuration management.
pub mod config;
/// Route execution and answer streaming.
pub mod dispatch;
/// Error types and result aliases for the application.
pub mod error;
/// Chat and embedding model clients.
pub mod llm;
/// Tracing subscriber setup.
pub mod logging;
/// Mock tool backend server.
pub mod mock_api;
/// Prompt templates for the chat paths and the intent classifier.
pub mod prompts;
/// Vector index and knowledge search.
pub mod retrieval;
/// Keyword and LLM intent classification and the orchestrator.
pub mod routing;
/// Conversation sessions and their store.
pub mod session;
/// Tool registry, selection, parameter extraction, execution and formatting.
pub mod tools;

pub use agent::{Agent, Command, Reply};
pub use config::Config;
pub use dispatch::{DispatchOutcome, ResponseDispatcher, ResponseSink};
pub use error::{AppError, AppResult};
pub use routing::{IntentMode, IntentOrchestrator, Route, RouteDecision};

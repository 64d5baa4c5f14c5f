//! Chat and embedding model backends.
//!
//! The rest of the crate talks to models through [`ChatBackend`] and
//! [`Embedder`]; [`OllamaClient`] implements both against a local Ollama
//! server.

mod client;
mod types;

pub use client::{ndjson_tokens, OllamaClient};
pub use types::{
    ChatRequest, EmbedRequest, EmbedResponse, Message, MessageRole, ModelRole, OllamaChatRequest,
    OllamaChatResponse, OllamaMessage, OllamaOptions,
};

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChatResult;

/// Ordered stream of generated text fragments.
pub type TokenStream = Pin<Box<dyn Stream<Item = ChatResult<String>> + Send>>;

/// A chat completion model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Run the request to completion and return the full text.
    async fn invoke(&self, request: ChatRequest) -> ChatResult<String>;

    /// Run the request and yield text fragments as they are generated.
    async fn stream(&self, request: ChatRequest) -> ChatResult<TokenStream>;
}

/// A text embedding model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> ChatResult<Vec<f32>>;
}

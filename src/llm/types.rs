use serde::{Deserialize, Serialize};

/// Message in a chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message.
    pub role: MessageRole,
    /// Message text.
    pub content: String,
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions.
    System,
    /// User input.
    User,
    /// Model output.
    Assistant,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Which configured model a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelRole {
    /// Conversational answers.
    #[default]
    Chat,
    /// Intent classification.
    Intent,
}

/// A rendered chat request, independent of the backend wire format.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Messages in order.
    pub messages: Vec<Message>,
    /// Which configured model answers.
    pub model: ModelRole,
}

impl ChatRequest {
    /// Create a chat-model request from messages
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            model: ModelRole::Chat,
        }
    }

    /// Target the intent classification model
    pub fn for_intent(mut self) -> Self {
        self.model = ModelRole::Intent;
        self
    }

    /// Content of the last user message, if any
    pub fn last_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
    }
}

/// Body of an Ollama `/api/chat` call
#[derive(Debug, Clone, Serialize)]
pub struct OllamaChatRequest<'a> {
    /// Model name.
    pub model: &'a str,
    /// Conversation so far.
    pub messages: &'a [Message],
    /// Whether to stream NDJSON lines.
    pub stream: bool,
    /// Sampling options.
    pub options: OllamaOptions,
}

/// Sampling options
#[derive(Debug, Clone, Serialize)]
pub struct OllamaOptions {
    /// Sampling temperature.
    pub temperature: f64,
}

/// Non-streaming `/api/chat` response, also the shape of each streamed line
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaChatResponse {
    /// Model that answered.
    #[serde(default)]
    pub model: Option<String>,
    /// Generated message, absent on error lines.
    #[serde(default)]
    pub message: Option<OllamaMessage>,
    /// Set on the final line.
    #[serde(default)]
    pub done: bool,
    /// Backend error text.
    #[serde(default)]
    pub error: Option<String>,
}

/// Message body inside an Ollama response
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaMessage {
    /// Role as sent by the backend.
    #[serde(default)]
    pub role: Option<String>,
    /// Message text.
    #[serde(default)]
    pub content: String,
}

/// Body of an Ollama `/api/embed` call
#[derive(Debug, Clone, Serialize)]
pub struct EmbedRequest<'a> {
    /// Embedding model name.
    pub model: &'a str,
    /// Text to embed.
    pub input: &'a str,
}

/// `/api/embed` response
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedResponse {
    /// One vector per input.
    pub embeddings: Vec<Vec<f32>>,
}

impl OllamaChatResponse {
    /// Message text, empty when absent
    pub fn content(&self) -> &str {
        self.message.as_ref().map(|m| m.content.as_str()).unwrap_or("")
    }
}

use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid or unusable configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },

    /// Chat backend failure.
    #[error("Chat backend error: {0}")]
    Chat(#[from] ChatError),

    /// Tool backend failure.
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Knowledge retrieval failure.
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Anything else.
    #[error("Internal error: {message}")]
    Internal {
        /// Error details.
        message: String,
    },
}

/// Chat completion backend errors
#[derive(Debug, Error)]
pub enum ChatError {
    /// Non-success HTTP status or an `error` field in the body.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or backend error text.
        message: String,
    },

    /// Body could not be parsed.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Parse failure details.
        message: String,
    },

    /// Streaming broke off mid-answer.
    #[error("Stream error: {message}")]
    Stream {
        /// Failure details.
        message: String,
    },

    /// Request exceeded the configured timeout.
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Tool execution errors
#[derive(Debug, Error)]
pub enum ToolError {
    /// Backend answered with `success: false`.
    #[error("Tool {tool} rejected the request: {message}")]
    Rejected {
        /// Tool name.
        tool: String,
        /// Backend message.
        message: String,
    },

    /// Non-success HTTP status without a rejection envelope.
    #[error("Tool {tool} returned {status}: {message}")]
    Api {
        /// Tool name.
        tool: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// An endpoint placeholder had no value.
    #[error("Missing path parameter for {tool}: {param}")]
    MissingPathParam {
        /// Tool name.
        tool: String,
        /// Placeholder name.
        param: String,
    },

    /// Body could not be parsed.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Parse failure details.
        message: String,
    },

    /// Request exceeded the configured timeout.
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Knowledge retrieval errors
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Search before the index was loaded.
    #[error("Knowledge index not initialized")]
    NotInitialized,

    /// Index file missing or malformed.
    #[error("Failed to load index {path}: {message}")]
    IndexLoad {
        /// Index file path.
        path: String,
        /// Failure details.
        message: String,
    },

    /// Query vector length differs from the index.
    #[error("Embedding dimension mismatch: index has {expected}, query has {actual}")]
    DimensionMismatch {
        /// Index dimension.
        expected: usize,
        /// Query vector length.
        actual: usize,
    },

    /// Query embedding failed.
    #[error("Embedding failed: {0}")]
    Embedding(#[from] ChatError),
}

/// LLM intent classification errors. Always recovered by the rule classifier.
#[derive(Debug, Error)]
pub enum ClassificationError {
    /// Intent model call failed.
    #[error("Classifier backend failed: {0}")]
    Backend(#[from] ChatError),

    /// Completion had no JSON object.
    #[error("No JSON found in classifier response: {preview}")]
    NoJson {
        /// Start of the completion.
        preview: String,
    },

    /// JSON did not match the expected shape.
    #[error("Invalid classifier response: {message}")]
    InvalidShape {
        /// Deserialization details.
        message: String,
    },
}

/// Reasons a tool route is abandoned before execution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    /// No tool scored above zero.
    #[error("No tool matched the query")]
    NoToolMatched,

    /// Extraction left a required parameter empty.
    #[error("Missing required parameter {param} for {tool}")]
    MissingParameter {
        /// Tool name.
        tool: String,
        /// Parameter name.
        param: String,
    },
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for chat backend operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Result type alias for tool execution
pub type ToolResult<T> = Result<T, ToolError>;

/// Result type alias for retrieval operations
pub type RetrievalResult<T> = Result<T, RetrievalError>;

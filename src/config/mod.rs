use std::env;
use std::path::PathBuf;

use crate::error::AppError;
use crate::routing::IntentMode;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Ollama endpoints and models.
    pub llm: LlmConfig,
    /// Tool backend.
    pub tools: ToolApiConfig,
    /// Knowledge index and search.
    pub retrieval: RetrievalConfig,
    /// Routing and dispatch flags.
    pub routing: RoutingConfig,
    /// Logging.
    pub logging: LoggingConfig,
    /// HTTP requests.
    pub request: RequestConfig,
    /// Mock tool backend.
    pub mock_api: MockApiConfig,
}

/// Ollama chat and embedding configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Ollama base URL.
    pub base_url: String,
    /// Model that writes answers.
    pub chat_model: String,
    /// Model used for intent classification.
    pub intent_model: String,
    /// Model used for query embeddings.
    pub embedding_model: String,
    /// Sampling temperature for answers.
    pub chat_temperature: f64,
    /// Sampling temperature for intent classification.
    pub intent_temperature: f64,
}

/// Tool backend configuration
#[derive(Debug, Clone)]
pub struct ToolApiConfig {
    /// Base URL of the tool endpoints.
    pub base_url: String,
}

/// Knowledge retrieval configuration
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Vector index file.
    pub index_path: PathBuf,
    /// Documents retrieved per query.
    pub top_k: usize,
    /// Characters kept per snippet.
    pub snippet_chars: usize,
}

/// Routing and dispatch behaviour
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// Intent mode for new sessions.
    pub default_mode: IntentMode,
    /// Answer generally when a tool call fails.
    pub fallback_on_tool_failure: bool,
    /// Have the chat model wrap up tool results.
    pub summarize_tool_results: bool,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable output.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Per-request timeout.
    pub timeout_ms: u64,
}

/// Mock tool API server configuration
#[derive(Debug, Clone)]
pub struct MockApiConfig {
    /// Listen port.
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let chat_model = env::var("CHAT_MODEL").unwrap_or_else(|_| "llama3.1:8b".to_string());

        let llm = LlmConfig {
            base_url: non_empty_var("OLLAMA_BASE_URL", "http://localhost:11434")?,
            intent_model: env::var("INTENT_MODEL").unwrap_or_else(|_| chat_model.clone()),
            chat_model,
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "nomic-embed-text".to_string()),
            chat_temperature: parsed_var("CHAT_TEMPERATURE", 0.7),
            intent_temperature: parsed_var("INTENT_TEMPERATURE", 0.3),
        };

        let tools = ToolApiConfig {
            base_url: non_empty_var("TOOL_API_BASE_URL", "http://localhost:3000")?,
        };

        let retrieval = RetrievalConfig {
            index_path: PathBuf::from(
                env::var("KNOWLEDGE_INDEX_PATH")
                    .unwrap_or_else(|_| "./data/knowledge_index.json".to_string()),
            ),
            top_k: parsed_var("RETRIEVAL_TOP_K", 3),
            snippet_chars: parsed_var("SNIPPET_CHARS", 150),
        };

        let default_mode = match env::var("INTENT_MODE") {
            Ok(raw) => raw.parse().map_err(|message| AppError::Config { message })?,
            Err(_) => IntentMode::Rule,
        };

        let routing = RoutingConfig {
            default_mode,
            fallback_on_tool_failure: parsed_var("FALLBACK_ON_TOOL_FAILURE", false),
            summarize_tool_results: parsed_var("SUMMARIZE_TOOL_RESULTS", true),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: parsed_var("REQUEST_TIMEOUT_MS", 30000),
        };

        let mock_api = MockApiConfig {
            port: parsed_var("MOCK_API_PORT", 3000),
        };

        Ok(Config {
            llm,
            tools,
            retrieval,
            routing,
            logging,
            request,
            mock_api,
        })
    }
}

/// Read a variable and parse it, keeping the default on absence or parse failure.
fn parsed_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn non_empty_var(key: &str, default: &str) -> Result<String, AppError> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() => Err(AppError::Config {
            message: format!("{} must not be empty", key),
        }),
        Ok(value) => Ok(value),
        Err(_) => Ok(default.to_string()),
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            chat_model: "llama3.1:8b".to_string(),
            intent_model: "llama3.1:8b".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            chat_temperature: 0.7,
            intent_temperature: 0.3,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("./data/knowledge_index.json"),
            top_k: 3,
            snippet_chars: 150,
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_mode: IntentMode::Rule,
            fallback_on_tool_failure: false,
            summarize_tool_results: true,
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout_ms: 30000 }
    }
}

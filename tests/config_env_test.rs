//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides. Config::from_env() also loads a .env
//! file via dotenvy, so each test sets the variables it asserts on.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use intent_router::config::{Config, LogFormat};
use intent_router::error::AppError;
use intent_router::routing::IntentMode;
use serial_test::serial;
use std::env;

#[test]
#[serial]
fn test_config_from_env_loads_successfully() {
    let result = Config::from_env();
    assert!(result.is_ok(), "Config::from_env() should succeed with defaults");
}

#[test]
#[serial]
fn test_config_from_env_custom_ollama() {
    env::set_var("OLLAMA_BASE_URL", "http://gpu-box:11434");
    env::set_var("CHAT_MODEL", "qwen2.5:7b");
    env::set_var("INTENT_MODEL", "qwen2.5:1.5b");

    let config = Config::from_env().unwrap();
    assert_eq!(config.llm.base_url, "http://gpu-box:11434");
    assert_eq!(config.llm.chat_model, "qwen2.5:7b");
    assert_eq!(config.llm.intent_model, "qwen2.5:1.5b");

    env::remove_var("OLLAMA_BASE_URL");
    env::remove_var("CHAT_MODEL");
    env::remove_var("INTENT_MODEL");
}

#[test]
#[serial]
fn test_config_intent_model_defaults_to_chat_model() {
    env::set_var("CHAT_MODEL", "qwen2.5:7b");
    env::remove_var("INTENT_MODEL");

    let config = Config::from_env().unwrap();
    assert_eq!(config.llm.intent_model, "qwen2.5:7b");

    env::remove_var("CHAT_MODEL");
}

#[test]
#[serial]
fn test_config_empty_base_url_rejected() {
    env::set_var("TOOL_API_BASE_URL", "  ");

    let result = Config::from_env();
    assert!(matches!(result, Err(AppError::Config { .. })));

    env::remove_var("TOOL_API_BASE_URL");
}

#[test]
#[serial]
fn test_config_intent_mode() {
    env::set_var("INTENT_MODE", "LLM");
    let config = Config::from_env().unwrap();
    assert_eq!(config.routing.default_mode, IntentMode::Llm);

    env::set_var("INTENT_MODE", "keywords");
    let result = Config::from_env();
    assert!(matches!(result, Err(AppError::Config { .. })));

    env::remove_var("INTENT_MODE");
}

#[test]
#[serial]
fn test_config_from_env_retrieval() {
    env::set_var("KNOWLEDGE_INDEX_PATH", "/srv/kb/index.json");
    env::set_var("RETRIEVAL_TOP_K", "5");
    env::set_var("SNIPPET_CHARS", "80");

    let config = Config::from_env().unwrap();
    assert_eq!(
        config.retrieval.index_path.to_str().unwrap(),
        "/srv/kb/index.json"
    );
    assert_eq!(config.retrieval.top_k, 5);
    assert_eq!(config.retrieval.snippet_chars, 80);

    env::remove_var("KNOWLEDGE_INDEX_PATH");
    env::remove_var("RETRIEVAL_TOP_K");
    env::remove_var("SNIPPET_CHARS");
}

#[test]
#[serial]
fn test_config_from_env_routing_flags() {
    env::set_var("FALLBACK_ON_TOOL_FAILURE", "true");
    env::set_var("SUMMARIZE_TOOL_RESULTS", "false");

    let config = Config::from_env().unwrap();
    assert!(config.routing.fallback_on_tool_failure);
    assert!(!config.routing.summarize_tool_results);

    env::remove_var("FALLBACK_ON_TOOL_FAILURE");
    env::remove_var("SUMMARIZE_TOOL_RESULTS");
}

#[test]
#[serial]
fn test_config_from_env_json_log_format() {
    env::set_var("LOG_FORMAT", "json");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);

    env::set_var("LOG_FORMAT", "pretty");
}

#[test]
#[serial]
fn test_config_from_env_custom_log_level() {
    env::set_var("LOG_LEVEL", "debug");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.level, "debug");

    env::set_var("LOG_LEVEL", "info");
}

#[test]
#[serial]
fn test_config_from_env_custom_request() {
    env::set_var("REQUEST_TIMEOUT_MS", "60000");
    env::set_var("MOCK_API_PORT", "3100");

    let config = Config::from_env().unwrap();
    assert_eq!(config.request.timeout_ms, 60000);
    assert_eq!(config.mock_api.port, 3100);

    env::remove_var("REQUEST_TIMEOUT_MS");
    env::remove_var("MOCK_API_PORT");
}

#[test]
#[serial]
fn test_config_invalid_numbers_keep_defaults() {
    env::set_var("RETRIEVAL_TOP_K", "many");
    env::set_var("REQUEST_TIMEOUT_MS", "soon");

    let config = Config::from_env().unwrap();
    assert_eq!(config.retrieval.top_k, 3);
    assert_eq!(config.request.timeout_ms, 30000);

    env::remove_var("RETRIEVAL_TOP_K");
    env::remove_var("REQUEST_TIMEOUT_MS");
}

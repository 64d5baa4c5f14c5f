use std::fmt::Display;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use tracing::{debug, error, info};

use super::types::{
    ChatRequest, EmbedRequest, EmbedResponse, ModelRole, OllamaChatRequest, OllamaChatResponse,
    OllamaOptions,
};
use super::{ChatBackend, Embedder, TokenStream};
use crate::config::{LlmConfig, RequestConfig};
use crate::error::{ChatError, ChatResult};

/// Client for the Ollama chat and embedding API
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    config: LlmConfig,
    request_config: RequestConfig,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &LlmConfig, request_config: RequestConfig) -> ChatResult<Self> {
        // Only the connect phase is bounded at client level; streamed bodies
        // may outlive the request timeout.
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(ChatError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
            request_config,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn model_for(&self, role: ModelRole) -> (&str, f64) {
        match role {
            ModelRole::Chat => (&self.config.chat_model, self.config.chat_temperature),
            ModelRole::Intent => (&self.config.intent_model, self.config.intent_temperature),
        }
    }

    fn timeout_error(&self, e: reqwest::Error) -> ChatError {
        if e.is_timeout() {
            ChatError::Timeout {
                timeout_ms: self.request_config.timeout_ms,
            }
        } else {
            ChatError::Http(e)
        }
    }

    /// Send a chat request and return the successful response (internal)
    async fn send_chat(
        &self,
        request: &ChatRequest,
        stream: bool,
    ) -> ChatResult<reqwest::Response> {
        let url = format!("{}/api/chat", self.base_url);
        let (model, temperature) = self.model_for(request.model);

        debug!(
            model = %model,
            messages = request.messages.len(),
            stream,
            "Calling chat model"
        );

        let body = OllamaChatRequest {
            model,
            messages: &request.messages,
            stream,
            options: OllamaOptions { temperature },
        };

        let mut builder = self.client.post(&url).json(&body);
        if !stream {
            builder = builder.timeout(Duration::from_millis(self.request_config.timeout_ms));
        }

        let response = builder.send().await.map_err(|e| self.timeout_error(e))?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ChatError::Api {
                status: status.as_u16(),
                message: error_message(&error_body),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn invoke(&self, request: ChatRequest) -> ChatResult<String> {
        let start = Instant::now();

        let result = async {
            let response = self.send_chat(&request, false).await?;
            let parsed: OllamaChatResponse =
                response
                    .json()
                    .await
                    .map_err(|e| ChatError::InvalidResponse {
                        message: format!("Failed to parse chat response: {}", e),
                    })?;

            if let Some(message) = parsed.error {
                return Err(ChatError::Api {
                    status: 200,
                    message,
                });
            }

            match parsed.message {
                Some(message) => Ok(message.content),
                None => Err(ChatError::InvalidResponse {
                    message: "Chat response has no message".to_string(),
                }),
            }
        }
        .await;

        match &result {
            Ok(text) => info!(
                model_role = ?request.model,
                chars = text.chars().count(),
                latency_ms = start.elapsed().as_millis(),
                "Chat call succeeded"
            ),
            Err(e) => error!(
                model_role = ?request.model,
                error = %e,
                latency_ms = start.elapsed().as_millis(),
                "Chat call failed"
            ),
        }

        result
    }

    async fn stream(&self, request: ChatRequest) -> ChatResult<TokenStream> {
        let response = self.send_chat(&request, true).await?;
        Ok(ndjson_tokens(Box::pin(response.bytes_stream())))
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> ChatResult<Vec<f32>> {
        let url = format!("{}/api/embed", self.base_url);
        let body = EmbedRequest {
            model: &self.config.embedding_model,
            input: text,
        };

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_millis(self.request_config.timeout_ms))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.timeout_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ChatError::Api {
                status: status.as_u16(),
                message: error_message(&error_body),
            });
        }

        let parsed: EmbedResponse =
            response
                .json()
                .await
                .map_err(|e| ChatError::InvalidResponse {
                    message: format!("Failed to parse embed response: {}", e),
                })?;

        parsed
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::InvalidResponse {
                message: "Embed response contains no vectors".to_string(),
            })
    }
}

/// Pull the `error` field out of an Ollama error body, or return the body as is.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

struct LineState<S> {
    bytes: S,
    buffer: Vec<u8>,
    eof: bool,
    done: bool,
}

/// Turn an NDJSON chat byte stream into text fragments.
///
/// Lines are split on raw bytes so multi-byte characters cut across chunks
/// survive. Empty fragments are skipped; the stream ends after a `done` line
/// or an `error` line.
pub fn ndjson_tokens<S, B, E>(bytes: S) -> TokenStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = LineState {
        bytes,
        buffer: Vec::new(),
        eof: false,
        done: false,
    };

    let stream = futures::stream::unfold(state, |mut state| async move {
        loop {
            if state.done {
                return None;
            }

            if let Some(pos) = state.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = state.buffer.drain(..=pos).collect();
                match parse_line(&line) {
                    LineOutcome::Skip => continue,
                    LineOutcome::Token(token) => return Some((Ok(token), state)),
                    LineOutcome::Final(token) => {
                        state.done = true;
                        match token {
                            Some(token) => return Some((Ok(token), state)),
                            None => return None,
                        }
                    }
                    LineOutcome::Error(e) => {
                        state.done = true;
                        return Some((Err(e), state));
                    }
                }
            }

            if state.eof {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => state.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    state.done = true;
                    return Some((
                        Err(ChatError::Stream {
                            message: e.to_string(),
                        }),
                        state,
                    ));
                }
                None => {
                    state.eof = true;
                    if state.buffer.iter().any(|b| !b.is_ascii_whitespace()) {
                        state.buffer.push(b'\n');
                    }
                }
            }
        }
    });

    Box::pin(stream)
}

enum LineOutcome {
    Skip,
    Token(String),
    Final(Option<String>),
    Error(ChatError),
}

fn parse_line(line: &[u8]) -> LineOutcome {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(e) => {
            return LineOutcome::Error(ChatError::Stream {
                message: format!("Invalid UTF-8 in stream: {}", e),
            })
        }
    };

    if text.is_empty() {
        return LineOutcome::Skip;
    }

    let parsed: OllamaChatResponse = match serde_json::from_str(text) {
        Ok(parsed) => parsed,
        Err(e) => {
            return LineOutcome::Error(ChatError::Stream {
                message: format!("Malformed stream line: {}", e),
            })
        }
    };

    if let Some(message) = parsed.error {
        return LineOutcome::Error(ChatError::Stream { message });
    }

    let content = parsed.content().to_string();
    if parsed.done {
        LineOutcome::Final((!content.is_empty()).then_some(content))
    } else if content.is_empty() {
        LineOutcome::Skip
    } else {
        LineOutcome::Token(content)
    }
}

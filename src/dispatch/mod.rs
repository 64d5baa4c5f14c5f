//! Executes a [`RouteDecision`] against exactly one downstream path and
//! streams the answer to a [`ResponseSink`].

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::llm::{ChatBackend, ChatRequest, Message};
use crate::prompts::{
    PromptTemplate, EMPTY_RESPONSE_NOTICE, GENERAL_TEMPLATE, RAG_TEMPLATE,
    RETRIEVAL_FAILED_NOTICE, TOOL_FAILED_PREFIX, TOOL_SUMMARY,
};
use crate::retrieval::{format_search_results, Retriever, SearchResult};
use crate::routing::{Route, RouteDecision};
use crate::session::ConversationSession;
use crate::tools::{format_tool_result, ToolDescriptor, ToolExecutor, ToolOutput, ToolParams};

/// Receives the answer as it is produced.
pub trait ResponseSink: Send {
    /// A streamed text fragment, in arrival order.
    fn token(&mut self, token: &str);

    /// The formatted result of a successful tool call.
    fn tool_summary(&mut self, _summary: &str) {}

    /// A status line outside the answer text (failures, fallbacks).
    fn notice(&mut self, _notice: &str) {}
}

/// Sink that keeps everything it receives.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BufferedSink {
    /// Streamed tokens, in order.
    pub tokens: Vec<String>,
    /// Tool summaries.
    pub summaries: Vec<String>,
    /// Notices.
    pub notices: Vec<String>,
}

impl BufferedSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenated tokens
    pub fn text(&self) -> String {
        self.tokens.concat()
    }
}

impl ResponseSink for BufferedSink {
    fn token(&mut self, token: &str) {
        self.tokens.push(token.to_string());
    }

    fn tool_summary(&mut self, summary: &str) {
        self.summaries.push(summary.to_string());
    }

    fn notice(&mut self, notice: &str) {
        self.notices.push(notice.to_string());
    }
}

/// The path that actually produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerPath {
    /// Plain chat.
    General,
    /// Chat grounded on retrieved documents.
    Knowledge,
    /// Tool result, optionally wrapped up by the chat model.
    Tool,
    /// Tool call failed and no fallback was configured.
    ToolFailed,
}

/// Result of dispatching one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchOutcome {
    /// Path that produced `answer`.
    pub path: AnswerPath,
    /// Assistant text recorded in the session history.
    pub answer: String,
    /// Tool payload on the tool path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_output: Option<ToolOutput>,
    /// Documents used on the knowledge path.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SearchResult>,
    /// Whether a failure moved the query onto the general path.
    pub fell_back: bool,
}

impl DispatchOutcome {
    fn new(path: AnswerPath, answer: String) -> Self {
        Self {
            path,
            answer,
            tool_output: None,
            sources: Vec::new(),
            fell_back: false,
        }
    }
}

/// Dispatcher settings
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    /// Documents retrieved per knowledge query.
    pub top_k: usize,
    /// Characters kept from each document.
    pub snippet_chars: usize,
    /// Answer from general chat when a tool call fails.
    pub fallback_on_tool_failure: bool,
    /// Stream a chat wrap-up after a tool result.
    pub summarize_tool_results: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            snippet_chars: 150,
            fallback_on_tool_failure: false,
            summarize_tool_results: true,
        }
    }
}

impl From<&Config> for DispatchConfig {
    fn from(config: &Config) -> Self {
        Self {
            top_k: config.retrieval.top_k,
            snippet_chars: config.retrieval.snippet_chars,
            fallback_on_tool_failure: config.routing.fallback_on_tool_failure,
            summarize_tool_results: config.routing.summarize_tool_results,
        }
    }
}

/// Runs the chosen path and records the exchange.
#[derive(Clone)]
pub struct ResponseDispatcher {
    chat: Arc<dyn ChatBackend>,
    retriever: Arc<dyn Retriever>,
    executor: Arc<dyn ToolExecutor>,
    config: DispatchConfig,
}

impl ResponseDispatcher {
    /// Create a dispatcher over the three collaborators
    pub fn new(
        chat: Arc<dyn ChatBackend>,
        retriever: Arc<dyn Retriever>,
        executor: Arc<dyn ToolExecutor>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            chat,
            retriever,
            executor,
            config,
        }
    }

    /// Dispatcher settings
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Answer `query` along `decision` and append the exchange to `session`.
    ///
    /// # Errors
    /// Chat backend failures end the query; nothing is appended in that case.
    /// Tool and retrieval failures are reported through the sink instead, and
    /// a failed wrap-up after a successful tool call keeps the tool summary
    /// as the answer.
    pub async fn dispatch(
        &self,
        decision: &RouteDecision,
        query: &str,
        session: &mut ConversationSession,
        sink: &mut dyn ResponseSink,
    ) -> AppResult<DispatchOutcome> {
        let start = Instant::now();
        let history = session.messages();

        let result = match &decision.route {
            Route::General => self.general(query, &history, sink).await,
            Route::Knowledge { query: search } => {
                self.knowledge(query, search, &history, sink).await
            }
            Route::Tool { tool, params } => self.tool(query, tool, params, &history, sink).await,
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    session_id = %session.id,
                    route = decision.route.kind(),
                    error = %e,
                    latency_ms = start.elapsed().as_millis(),
                    "Dispatch failed"
                );
                return Err(e);
            }
        };

        session.append_exchange(query, outcome.answer.clone());

        info!(
            session_id = %session.id,
            route = decision.route.kind(),
            path = ?outcome.path,
            fell_back = outcome.fell_back,
            answer_chars = outcome.answer.chars().count(),
            latency_ms = start.elapsed().as_millis(),
            "Dispatch completed"
        );

        Ok(outcome)
    }

    async fn general(
        &self,
        query: &str,
        history: &[Message],
        sink: &mut dyn ResponseSink,
    ) -> AppResult<DispatchOutcome> {
        let answer = self
            .stream(GENERAL_TEMPLATE, &[("input", query)], history, sink)
            .await?;
        Ok(DispatchOutcome::new(AnswerPath::General, answer))
    }

    async fn knowledge(
        &self,
        query: &str,
        search: &str,
        history: &[Message],
        sink: &mut dyn ResponseSink,
    ) -> AppResult<DispatchOutcome> {
        let results = match self.retriever.search(search, self.config.top_k).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "Retrieval failed, answering without documents");
                sink.notice(RETRIEVAL_FAILED_NOTICE);
                let mut outcome = self.general(query, history, sink).await?;
                outcome.fell_back = true;
                return Ok(outcome);
            }
        };

        let docs = format_search_results(&results, self.config.snippet_chars);
        let answer = self
            .stream(RAG_TEMPLATE, &[("input", query), ("docs", docs.as_str())], history, sink)
            .await?;

        let mut outcome = DispatchOutcome::new(AnswerPath::Knowledge, answer);
        outcome.sources = results;
        Ok(outcome)
    }

    async fn tool(
        &self,
        query: &str,
        tool: &ToolDescriptor,
        params: &ToolParams,
        history: &[Message],
        sink: &mut dyn ResponseSink,
    ) -> AppResult<DispatchOutcome> {
        let output = match self.executor.execute(tool, params).await {
            Ok(output) => output,
            Err(e) => {
                let message = format!("{}: {}", TOOL_FAILED_PREFIX, e);
                warn!(tool = %tool.name, error = %e, "Tool call failed");
                sink.notice(&message);

                if self.config.fallback_on_tool_failure {
                    let mut outcome = self.general(query, history, sink).await?;
                    outcome.fell_back = true;
                    return Ok(outcome);
                }
                return Ok(DispatchOutcome::new(AnswerPath::ToolFailed, message));
            }
        };

        let summary = format_tool_result(&output);
        sink.tool_summary(&summary);

        if !self.config.summarize_tool_results {
            let mut outcome = DispatchOutcome::new(AnswerPath::Tool, summary);
            outcome.tool_output = Some(output);
            return Ok(outcome);
        }

        let wrap_up = self
            .stream(
                TOOL_SUMMARY,
                &[("input", query), ("tool_result", summary.as_str())],
                history,
                sink,
            )
            .await;

        // The user has already seen the summary, so it stands as the answer.
        let mut outcome = match wrap_up {
            Ok(answer) => DispatchOutcome::new(AnswerPath::Tool, answer),
            Err(e) => {
                warn!(tool = %tool.name, error = %e, "Tool wrap-up failed, keeping the summary");
                let mut outcome = DispatchOutcome::new(AnswerPath::Tool, summary);
                outcome.fell_back = true;
                outcome
            }
        };
        outcome.tool_output = Some(output);
        Ok(outcome)
    }

    /// Render, stream every token to the sink and return the full text.
    async fn stream(
        &self,
        template: PromptTemplate,
        vars: &[(&str, &str)],
        history: &[Message],
        sink: &mut dyn ResponseSink,
    ) -> AppResult<String> {
        let request = ChatRequest::new(template.render(vars, history));
        let mut tokens = self.chat.stream(request).await?;

        let mut answer = String::new();
        while let Some(token) = tokens.next().await {
            let token = token?;
            sink.token(&token);
            answer.push_str(&token);
        }

        if answer.is_empty() {
            sink.notice(EMPTY_RESPONSE_NOTICE);
        }

        Ok(answer)
    }
}

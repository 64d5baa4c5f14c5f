//! Agent integration tests
//!
//! Drives whole input lines through routing and dispatch with in-process
//! fakes for the chat model, the retriever and the tool backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;
use serde_json::json;

use intent_router::agent::{Agent, Reply};
use intent_router::dispatch::{AnswerPath, BufferedSink, DispatchConfig, ResponseDispatcher};
use intent_router::error::{
    AppError, ChatError, ChatResult, RetrievalError, RetrievalResult, ToolError, ToolResult,
};
use intent_router::llm::{ChatBackend, ChatRequest, MessageRole, TokenStream};
use intent_router::retrieval::{Retriever, SearchResult};
use intent_router::routing::{DecisionSource, IntentMode, IntentOrchestrator, Route};
use intent_router::session::InMemorySessionStore;
use intent_router::tools::{ParamValue, ToolDescriptor, ToolExecutor, ToolOutput, ToolParams, ToolRegistry};

// ============================================================================
// Fakes
// ============================================================================

/// Streams a fixed answer and replies to intent requests with `intent_reply`.
struct FakeChat {
    answer: Vec<&'static str>,
    intent_reply: String,
    fail_stream: bool,
    streams: AtomicUsize,
    intents: AtomicUsize,
    last_prompt: Mutex<Option<ChatRequest>>,
}

impl FakeChat {
    fn new(answer: Vec<&'static str>) -> Self {
        Self {
            answer,
            intent_reply: String::new(),
            fail_stream: false,
            streams: AtomicUsize::new(0),
            intents: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    fn with_intent_reply(mut self, reply: &str) -> Self {
        self.intent_reply = reply.to_string();
        self
    }

    fn failing() -> Self {
        let mut chat = Self::new(vec![]);
        chat.fail_stream = true;
        chat
    }
}

#[async_trait]
impl ChatBackend for FakeChat {
    async fn invoke(&self, _request: ChatRequest) -> ChatResult<String> {
        self.intents.fetch_add(1, Ordering::SeqCst);
        Ok(self.intent_reply.clone())
    }

    async fn stream(&self, request: ChatRequest) -> ChatResult<TokenStream> {
        self.streams.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(request);
        if self.fail_stream {
            return Err(ChatError::Stream {
                message: "connection reset".to_string(),
            });
        }
        let tokens: Vec<ChatResult<String>> =
            self.answer.iter().map(|t| Ok(t.to_string())).collect();
        Ok(Box::pin(stream::iter(tokens)))
    }
}

#[derive(Default)]
struct FakeRetriever {
    calls: Mutex<Vec<(String, usize)>>,
    fail: bool,
}

#[async_trait]
impl Retriever for FakeRetriever {
    async fn search(&self, query: &str, top_k: usize) -> RetrievalResult<Vec<SearchResult>> {
        self.calls.lock().unwrap().push((query.to_string(), top_k));
        if self.fail {
            return Err(RetrievalError::NotInitialized);
        }
        Ok(vec![SearchResult {
            source: "coding_standards.md".to_string(),
            text: "所有函数必须有注释。".to_string(),
            score: 0.8,
        }])
    }
}

#[derive(Default)]
struct FakeExecutor {
    calls: Mutex<Vec<(String, ToolParams)>>,
    fail: bool,
}

#[async_trait]
impl ToolExecutor for FakeExecutor {
    async fn execute(&self, tool: &ToolDescriptor, params: &ToolParams) -> ToolResult<ToolOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((tool.name.clone(), params.clone()));
        if self.fail {
            return Err(ToolError::Rejected {
                tool: tool.name.clone(),
                message: "计算失败".to_string(),
            });
        }
        Ok(ToolOutput {
            tool: tool.name.clone(),
            data: json!({"expression": "2+3*4", "result": 14}),
            count: None,
        })
    }
}

struct Harness {
    agent: Agent,
    chat: Arc<FakeChat>,
    retriever: Arc<FakeRetriever>,
    executor: Arc<FakeExecutor>,
}

fn harness_with(
    chat: FakeChat,
    retriever: FakeRetriever,
    executor: FakeExecutor,
    config: DispatchConfig,
) -> Harness {
    let chat = Arc::new(chat);
    let retriever = Arc::new(retriever);
    let executor = Arc::new(executor);

    let orchestrator =
        IntentOrchestrator::new(Arc::new(ToolRegistry::new())).with_llm(chat.clone());
    let dispatcher =
        ResponseDispatcher::new(chat.clone(), retriever.clone(), executor.clone(), config);
    let agent = Agent::new(
        orchestrator,
        dispatcher,
        Arc::new(InMemorySessionStore::new()),
        IntentMode::Rule,
    );

    Harness {
        agent,
        chat,
        retriever,
        executor,
    }
}

fn harness(chat: FakeChat) -> Harness {
    harness_with(
        chat,
        FakeRetriever::default(),
        FakeExecutor::default(),
        DispatchConfig::default(),
    )
}

async fn ask(h: &Harness, session: &str, input: &str) -> (Reply, BufferedSink) {
    let mut sink = BufferedSink::new();
    let reply = h.agent.handle_input(session, input, &mut sink).await.unwrap();
    (reply, sink)
}

// ============================================================================
// Path selection
// ============================================================================

#[cfg(test)]
mod path_tests {
    use super::*;

    #[tokio::test]
    async fn test_greeting_is_general_only() {
        let h = harness(FakeChat::new(vec!["你好", "！"]));
        let (reply, sink) = ask(&h, "s1", "你好").await;

        let Reply::Answered { decision, outcome } = reply else {
            panic!("expected an answer");
        };
        assert_eq!(decision.route, Route::General);
        assert_eq!(outcome.path, AnswerPath::General);
        assert_eq!(sink.tokens, vec!["你好", "！"]);
        assert!(h.retriever.calls.lock().unwrap().is_empty());
        assert!(h.executor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_knowledge_question_retrieves_three() {
        let h = harness(FakeChat::new(vec!["所有函数必须有注释。"]));
        let (reply, _) = ask(&h, "s1", "代码规范是什么").await;

        let Reply::Answered { decision, outcome } = reply else {
            panic!("expected an answer");
        };
        assert_eq!(decision.route.kind(), "knowledge");
        assert_eq!(outcome.path, AnswerPath::Knowledge);
        assert_eq!(outcome.sources.len(), 1);

        let calls = h.retriever.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, 3);
        assert!(h.executor.calls.lock().unwrap().is_empty());

        let prompt = h.chat.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(prompt.messages[0].role, MessageRole::System);
        let human = prompt.messages.last().unwrap();
        assert_eq!(human.role, MessageRole::User);
        assert!(human.content.contains("【1】所有函数必须有注释。..."));
    }

    #[tokio::test]
    async fn test_arithmetic_calls_calculate() {
        let h = harness(FakeChat::new(vec!["结果是14"]));
        let (reply, sink) = ask(&h, "s1", "2+3*4").await;

        let Reply::Answered { outcome, .. } = reply else {
            panic!("expected an answer");
        };
        assert_eq!(outcome.path, AnswerPath::Tool);
        assert_eq!(sink.summaries, vec!["计算结果：2+3*4 = 14"]);
        assert_eq!(outcome.answer, "结果是14");

        let calls = h.executor.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "calculate");
        assert_eq!(
            calls[0].1.get("expression"),
            Some(&ParamValue::from("2+3*4"))
        );
        assert!(h.retriever.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tool_result_without_summary() {
        let h = harness_with(
            FakeChat::new(vec!["unused"]),
            FakeRetriever::default(),
            FakeExecutor::default(),
            DispatchConfig {
                summarize_tool_results: false,
                ..DispatchConfig::default()
            },
        );
        let (reply, sink) = ask(&h, "s1", "2+3*4").await;

        let Reply::Answered { outcome, .. } = reply else {
            panic!("expected an answer");
        };
        assert_eq!(outcome.answer, "计算结果：2+3*4 = 14");
        assert!(sink.tokens.is_empty());
        assert_eq!(h.chat.streams.load(Ordering::SeqCst), 0);
    }
}

// ============================================================================
// Failures
// ============================================================================

#[cfg(test)]
mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_tool_failure_reported_without_fallback() {
        let h = harness_with(
            FakeChat::new(vec!["unused"]),
            FakeRetriever::default(),
            FakeExecutor {
                fail: true,
                ..FakeExecutor::default()
            },
            DispatchConfig::default(),
        );
        let (reply, sink) = ask(&h, "s1", "2+3*4").await;

        let Reply::Answered { outcome, .. } = reply else {
            panic!("expected an answer");
        };
        assert_eq!(outcome.path, AnswerPath::ToolFailed);
        assert!(sink.notices[0].starts_with("工具调用失败"));
        assert_eq!(h.chat.streams.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_tool_failure_falls_back_when_configured() {
        let h = harness_with(
            FakeChat::new(vec!["我来直接回答"]),
            FakeRetriever::default(),
            FakeExecutor {
                fail: true,
                ..FakeExecutor::default()
            },
            DispatchConfig {
                fallback_on_tool_failure: true,
                ..DispatchConfig::default()
            },
        );
        let (reply, sink) = ask(&h, "s1", "2+3*4").await;

        let Reply::Answered { outcome, .. } = reply else {
            panic!("expected an answer");
        };
        assert_eq!(outcome.path, AnswerPath::General);
        assert!(outcome.fell_back);
        assert_eq!(sink.text(), "我来直接回答");
    }

    #[tokio::test]
    async fn test_retrieval_failure_answers_generally() {
        let h = harness_with(
            FakeChat::new(vec!["一般回答"]),
            FakeRetriever {
                fail: true,
                ..FakeRetriever::default()
            },
            FakeExecutor::default(),
            DispatchConfig::default(),
        );
        let (reply, sink) = ask(&h, "s1", "代码规范是什么").await;

        let Reply::Answered { outcome, .. } = reply else {
            panic!("expected an answer");
        };
        assert_eq!(outcome.path, AnswerPath::General);
        assert!(outcome.fell_back);
        assert_eq!(sink.notices.len(), 1);
    }

    #[tokio::test]
    async fn test_chat_failure_leaves_history_untouched() {
        let h = harness(FakeChat::failing());
        let mut sink = BufferedSink::new();

        let result = h.agent.handle_input("s1", "你好", &mut sink).await;
        assert!(matches!(result, Err(AppError::Chat(_))));
        assert!(h.agent.history("s1").await.is_empty());
    }

    #[tokio::test]
    async fn test_wrap_up_failure_keeps_tool_summary_in_history() {
        let h = harness(FakeChat::failing());
        let (reply, sink) = ask(&h, "s1", "2+3*4").await;

        let Reply::Answered { outcome, .. } = reply else {
            panic!("expected an answer");
        };
        assert_eq!(outcome.path, AnswerPath::Tool);
        assert_eq!(outcome.answer, "计算结果：2+3*4 = 14");
        assert_eq!(sink.summaries, vec!["计算结果：2+3*4 = 14"]);

        let history = h.agent.history("s1").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "计算结果：2+3*4 = 14");
    }
}

// ============================================================================
// Sessions and modes
// ============================================================================

#[cfg(test)]
mod session_tests {
    use super::*;

    #[tokio::test]
    async fn test_history_grows_per_exchange() {
        let h = harness(FakeChat::new(vec!["你好！"]));
        ask(&h, "s1", "你好").await;
        ask(&h, "s1", "谢谢").await;

        let history = h.agent.history("s1").await;
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[0].content, "你好");
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[1].content, "你好！");

        // the second request carries the first exchange
        let prompt = h.chat.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.messages.iter().any(|m| m.content == "你好！"));
    }

    #[tokio::test]
    async fn test_reset_clears_only_target_session() {
        let h = harness(FakeChat::new(vec!["好的"]));
        ask(&h, "a", "你好").await;
        ask(&h, "b", "你好").await;

        let (reply, _) = ask(&h, "a", "clear").await;
        assert_eq!(reply, Reply::Cleared);

        assert!(h.agent.history("a").await.is_empty());
        assert_eq!(h.agent.history("b").await.len(), 2);
    }

    #[tokio::test]
    async fn test_control_inputs() {
        let h = harness(FakeChat::new(vec!["unused"]));
        assert_eq!(ask(&h, "s1", "   ").await.0, Reply::Empty);
        assert_eq!(ask(&h, "s1", "退出").await.0, Reply::Exit);
        assert_eq!(h.chat.streams.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mode_switch_uses_llm_classifier() {
        let h = harness(
            FakeChat::new(vec!["回答"])
                .with_intent_reply(r#"{"needs_retrieval": true, "reason": "需要查资料", "confidence": 0.9}"#),
        );

        let query = "我想了解一下来龙去脉";
        let before = h.agent.route("s1", query).await;
        assert_eq!(before.route, Route::General);
        assert_eq!(h.chat.intents.load(Ordering::SeqCst), 0);

        let (reply, _) = ask(&h, "s1", "mode llm").await;
        assert_eq!(reply, Reply::ModeChanged(IntentMode::Llm));

        let after = h.agent.route("s1", query).await;
        assert_eq!(after.route.kind(), "knowledge");
        assert_eq!(after.source, DecisionSource::Llm);
        assert_eq!(after.confidence, 0.9);
        assert_eq!(h.chat.intents.load(Ordering::SeqCst), 1);

        // other sessions keep the default mode
        let other = h.agent.route("s2", query).await;
        assert_eq!(other.source, DecisionSource::Rule);
    }

    #[tokio::test]
    async fn test_llm_garbage_falls_back_to_rules() {
        let h = harness(FakeChat::new(vec!["回答"]).with_intent_reply("I think it needs retrieval"));
        ask(&h, "s1", "mode llm").await;

        let decision = h.agent.route("s1", "我想了解一下来龙去脉").await;
        assert_eq!(decision.route, Route::General);
        assert_eq!(decision.source, DecisionSource::Rule);
        assert_eq!(h.chat.intents.load(Ordering::SeqCst), 1);
    }
}

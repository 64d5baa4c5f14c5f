use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::classifier::{ClassifierConfig, RouteKind};
use super::intent::LlmIntentClassifier;
use super::{IntentMode, RouteDecision, DEFAULT_LLM_CONFIDENCE};
use crate::error::RoutingError;
use crate::llm::ChatBackend;
use crate::tools::{extract_params, missing_required, ToolDescriptor, ToolParams, ToolRegistry};

/// Orchestrator states, reported in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStage {
    /// Gate and tool selection.
    ToolCheck,
    /// A tool with all required parameters was found.
    ToolSelected,
    /// Rule or LLM knowledge classification.
    KnowledgeCheck,
    /// A decision was produced.
    Resolved,
}

impl RouteStage {
    /// Get the stage name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStage::ToolCheck => "tool_check",
            RouteStage::ToolSelected => "tool_selected",
            RouteStage::KnowledgeCheck => "knowledge_check",
            RouteStage::Resolved => "resolved",
        }
    }
}

/// Turns a query into a [`RouteDecision`].
///
/// Tool routing always runs first. When it does not produce a complete tool
/// call, the knowledge check decides between retrieval and plain chat.
#[derive(Clone)]
pub struct IntentOrchestrator {
    registry: Arc<ToolRegistry>,
    classifier: ClassifierConfig,
    llm: Option<LlmIntentClassifier>,
}

impl IntentOrchestrator {
    /// Create an orchestrator with rule classification only
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            classifier: ClassifierConfig::default(),
            llm: None,
        }
    }

    /// Enable LLM classification for sessions in [`IntentMode::Llm`]
    pub fn with_llm(mut self, chat: Arc<dyn ChatBackend>) -> Self {
        self.llm = Some(LlmIntentClassifier::new(chat));
        self
    }

    /// Replace the keyword tables
    pub fn with_classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }

    /// The tool registry
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Gate, select and extract. Succeeds only with every required parameter.
    pub fn route_tool(&self, query: &str) -> Result<(ToolDescriptor, ToolParams), RoutingError> {
        let tool = self
            .registry
            .select_tool(query)
            .ok_or(RoutingError::NoToolMatched)?;

        let params = extract_params(query, tool);
        if let Some(param) = missing_required(tool, &params) {
            return Err(RoutingError::MissingParameter {
                tool: tool.name.clone(),
                param,
            });
        }

        Ok((tool.clone(), params))
    }

    /// Decide how to answer `query`. Never fails.
    pub async fn decide(&self, query: &str, mode: IntentMode) -> RouteDecision {
        let start = Instant::now();
        let query = query.trim();

        let decision = if query.is_empty() {
            RouteDecision::general("empty query")
        } else {
            match self.tool_decision(query) {
                Some(decision) => decision,
                None => self.knowledge_decision(query, mode).await,
            }
        };

        info!(
            stage = RouteStage::Resolved.as_str(),
            route = decision.route.kind(),
            source = ?decision.source,
            confidence = decision.confidence,
            mode = %mode,
            latency_ms = start.elapsed().as_millis(),
            "Routing completed"
        );

        decision
    }

    fn tool_decision(&self, query: &str) -> Option<RouteDecision> {
        if !self.registry.should_use_tool(query) {
            debug!(stage = RouteStage::ToolCheck.as_str(), "Tool gate closed");
            return None;
        }

        match self.route_tool(query) {
            Ok((tool, params)) => {
                debug!(
                    stage = RouteStage::ToolSelected.as_str(),
                    tool = %tool.name,
                    params = ?params,
                    "Tool route selected"
                );
                let reason = format!("matched tool {}", tool.name);
                Some(RouteDecision::tool(tool, params, reason))
            }
            Err(e) => {
                debug!(
                    stage = RouteStage::ToolCheck.as_str(),
                    reason = %e,
                    "Tool route abandoned, continuing with knowledge check"
                );
                None
            }
        }
    }

    async fn knowledge_decision(&self, query: &str, mode: IntentMode) -> RouteDecision {
        debug!(stage = RouteStage::KnowledgeCheck.as_str(), mode = %mode, "Checking knowledge intent");

        if mode == IntentMode::Llm {
            match &self.llm {
                Some(llm) => match llm.classify(query).await {
                    Ok(response) => {
                        let confidence = response.confidence.unwrap_or(DEFAULT_LLM_CONFIDENCE);
                        let decision = if response.needs_retrieval {
                            RouteDecision::knowledge(query, response.reason)
                        } else {
                            RouteDecision::general(response.reason)
                        };
                        return decision.from_llm(confidence);
                    }
                    Err(e) => {
                        warn!(error = %e, "LLM intent classification failed, using rules");
                    }
                },
                None => warn!("LLM mode requested without an intent model, using rules"),
            }
        }

        let classification = self.classifier.classify(query);
        match classification.kind {
            RouteKind::Knowledge => RouteDecision::knowledge(query, classification.reason),
            RouteKind::General => RouteDecision::general(classification.reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use crate::llm::MockChatBackend;
    use crate::routing::{DecisionSource, Route};
    use crate::tools::ParamValue;
    use pretty_assertions::assert_eq;

    fn orchestrator() -> IntentOrchestrator {
        IntentOrchestrator::new(Arc::new(ToolRegistry::new()))
    }

    fn llm_orchestrator(reply: Result<&'static str, ()>) -> IntentOrchestrator {
        let mut chat = MockChatBackend::new();
        chat.expect_invoke().returning(move |_| match reply {
            Ok(text) => Ok(text.to_string()),
            Err(()) => Err(ChatError::Api {
                status: 500,
                message: "boom".to_string(),
            }),
        });
        orchestrator().with_llm(Arc::new(chat))
    }

    // ========================================================================
    // Tool routing
    // ========================================================================

    #[tokio::test]
    async fn test_arithmetic_routes_to_calculate() {
        let decision = orchestrator().decide("2+3*4", IntentMode::Rule).await;
        match decision.route {
            Route::Tool { tool, params } => {
                assert_eq!(tool.name, "calculate");
                assert_eq!(params.get("expression"), Some(&ParamValue::from("2+3*4")));
            }
            other => panic!("expected tool route, got {other:?}"),
        }
        assert_eq!(decision.source, DecisionSource::Rule);
    }

    #[tokio::test]
    async fn test_tool_route_ignores_mode() {
        // Tool precedence holds even when the LLM would disagree
        let decision = llm_orchestrator(Ok(r#"{"needs_retrieval": true, "reason": "x"}"#))
            .decide("20摄氏度等于多少华氏度", IntentMode::Llm)
            .await;
        assert_eq!(decision.route.kind(), "tool");
    }

    #[test]
    fn test_route_tool_missing_parameter() {
        let err = orchestrator().route_tool("帮我计算一下").unwrap_err();
        assert_eq!(
            err,
            RoutingError::MissingParameter {
                tool: "calculate".to_string(),
                param: "expression".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_parameter_falls_through_to_knowledge_check() {
        // Gate opens on "计算" but no expression can be extracted
        let decision = orchestrator().decide("帮我计算一下", IntentMode::Rule).await;
        assert_eq!(decision.route, Route::General);
        assert!(decision.reason.contains("math"));
    }

    #[tokio::test]
    async fn test_gated_without_tool_falls_through() {
        let mut registry = ToolRegistry::empty();
        registry
            .register(ToolDescriptor::new(
                "ping",
                crate::tools::ToolCategory::System,
                "ping",
                "/ping",
            ))
            .unwrap();
        let orchestrator = IntentOrchestrator::new(Arc::new(registry));

        // "项目" opens the gate but no data-query tool is registered
        assert_eq!(
            orchestrator.route_tool("项目的开发流程说明").unwrap_err(),
            RoutingError::NoToolMatched
        );
        let decision = orchestrator.decide("项目的开发流程说明", IntentMode::Rule).await;
        assert_eq!(decision.route.kind(), "knowledge");
    }

    // ========================================================================
    // Knowledge check
    // ========================================================================

    #[tokio::test]
    async fn test_knowledge_question() {
        let decision = orchestrator().decide("代码规范是什么", IntentMode::Rule).await;
        assert_eq!(
            decision.route,
            Route::Knowledge {
                query: "代码规范是什么".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_greeting_is_general() {
        let decision = orchestrator().decide("你好", IntentMode::Rule).await;
        assert_eq!(decision.route, Route::General);
    }

    #[tokio::test]
    async fn test_empty_query_is_general() {
        let decision = orchestrator().decide("  ", IntentMode::Llm).await;
        assert_eq!(decision.route, Route::General);
    }

    #[tokio::test]
    async fn test_same_query_same_decision() {
        let orchestrator = orchestrator();
        for query in ["2+3*4", "代码规范是什么", "你好", "查询用户张三的信息"] {
            let first = orchestrator.decide(query, IntentMode::Rule).await;
            let second = orchestrator.decide(query, IntentMode::Rule).await;
            assert_eq!(first, second);
        }
    }

    #[tokio::test]
    async fn test_llm_decision_used() {
        let decision = llm_orchestrator(Ok(
            r#"{"needs_retrieval": false, "reason": "闲聊", "confidence": 0.95}"#,
        ))
        .decide("代码规范是什么", IntentMode::Llm)
        .await;
        assert_eq!(decision.route, Route::General);
        assert_eq!(decision.source, DecisionSource::Llm);
        assert_eq!(decision.confidence, 0.95);
        assert_eq!(decision.reason, "闲聊");
    }

    #[tokio::test]
    async fn test_llm_default_confidence() {
        let decision = llm_orchestrator(Ok(r#"{"needs_retrieval": true, "reason": "规范"}"#))
            .decide("给我讲讲 onboarding 的 安排 细节", IntentMode::Llm)
            .await;
        assert_eq!(decision.route.kind(), "knowledge");
        assert_eq!(decision.confidence, DEFAULT_LLM_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_llm_failure_falls_back_to_rules() {
        let decision = llm_orchestrator(Err(()))
            .decide("代码规范是什么", IntentMode::Llm)
            .await;
        assert_eq!(decision.route.kind(), "knowledge");
        assert_eq!(decision.source, DecisionSource::Rule);
    }

    #[tokio::test]
    async fn test_llm_garbage_falls_back_to_rules() {
        let decision = llm_orchestrator(Ok("sure, retrieval is needed"))
            .decide("你好", IntentMode::Llm)
            .await;
        assert_eq!(decision.route, Route::General);
        assert_eq!(decision.source, DecisionSource::Rule);
    }

    #[tokio::test]
    async fn test_rule_mode_never_calls_llm() {
        let mut chat = MockChatBackend::new();
        chat.expect_invoke().times(0);
        let orchestrator = orchestrator().with_llm(Arc::new(chat));

        let decision = orchestrator.decide("代码规范是什么", IntentMode::Rule).await;
        assert_eq!(decision.source, DecisionSource::Rule);
    }
}

//! Query routing: the keyword classifier, the LLM intent classifier and the
//! orchestrator that turns a query into a [`RouteDecision`].

mod classifier;
mod intent;
mod orchestrator;

pub use classifier::{
    classify, Classification, ClassifierConfig, RouteKind, GENERAL_QUESTIONS, KNOWLEDGE_KEYWORDS,
    QUESTION_WORDS,
};
pub use intent::{IntentResponse, LlmIntentClassifier};
pub use orchestrator::{IntentOrchestrator, RouteStage};

use serde::{Deserialize, Serialize};

use crate::tools::{ToolDescriptor, ToolParams};

/// Confidence attached to every rule-based decision.
pub const RULE_CONFIDENCE: f64 = 0.8;

/// Confidence assumed when the LLM classifier omits one.
pub const DEFAULT_LLM_CONFIDENCE: f64 = 0.7;

/// How the knowledge check is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentMode {
    /// Keyword tables only.
    #[default]
    Rule,
    /// LLM classification, falling back to keyword tables.
    Llm,
}

impl IntentMode {
    /// Get the mode name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentMode::Rule => "rule",
            IntentMode::Llm => "llm",
        }
    }
}

impl std::fmt::Display for IntentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IntentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rule" => Ok(IntentMode::Rule),
            "llm" => Ok(IntentMode::Llm),
            _ => Err(format!("Unknown intent mode: {} (expected 'rule' or 'llm')", s)),
        }
    }
}

/// The downstream path chosen for a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum Route {
    /// Plain conversation.
    General,
    /// Retrieval-augmented answer.
    Knowledge {
        /// Text that gets searched.
        query: String,
    },
    /// Tool execution.
    Tool {
        /// Selected tool.
        tool: ToolDescriptor,
        /// Extracted parameters.
        params: ToolParams,
    },
}

impl Route {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Route::General => "general",
            Route::Knowledge { .. } => "knowledge",
            Route::Tool { .. } => "tool",
        }
    }
}

/// Which classifier produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionSource {
    /// Keyword tables or tool scoring.
    Rule,
    /// The LLM intent classifier.
    Llm,
}

/// Routing outcome for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteDecision {
    /// Chosen path.
    #[serde(flatten)]
    pub route: Route,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// What produced the decision.
    pub source: DecisionSource,
    /// Human-readable explanation.
    pub reason: String,
}

impl RouteDecision {
    /// Rule-based general decision.
    pub fn general(reason: impl Into<String>) -> Self {
        Self {
            route: Route::General,
            confidence: RULE_CONFIDENCE,
            source: DecisionSource::Rule,
            reason: reason.into(),
        }
    }

    /// Rule-based knowledge decision.
    pub fn knowledge(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            route: Route::Knowledge {
                query: query.into(),
            },
            confidence: RULE_CONFIDENCE,
            source: DecisionSource::Rule,
            reason: reason.into(),
        }
    }

    /// Rule-based tool decision.
    pub fn tool(tool: ToolDescriptor, params: ToolParams, reason: impl Into<String>) -> Self {
        Self {
            route: Route::Tool { tool, params },
            confidence: RULE_CONFIDENCE,
            source: DecisionSource::Rule,
            reason: reason.into(),
        }
    }

    /// Mark the decision as coming from the LLM classifier.
    pub fn from_llm(mut self, confidence: f64) -> Self {
        self.source = DecisionSource::Llm;
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

/// Locate the JSON object in a model completion.
///
/// Accepts raw JSON, fenced ```` ```json ```` blocks and plain fences, then
/// falls back to the span between the first `{` and the last `}`.
pub(crate) fn extract_json_from_completion(completion: &str) -> Result<&str, String> {
    let trimmed = completion.trim();
    if trimmed.starts_with('{') {
        return Ok(trimmed);
    }

    if completion.contains("```json") {
        if let Some(block) = completion
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return Ok(block);
        }
    } else if completion.contains("```") {
        if let Some(block) = completion
            .split("```")
            .nth(1)
            .map(str::trim)
            .filter(|s| s.starts_with('{'))
        {
            return Ok(block);
        }
    }

    match (completion.find('{'), completion.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&completion[start..=end]),
        _ => Err(format!(
            "No JSON found in response. First 100 chars: '{}'",
            completion.chars().take(100).collect::<String>()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;

    #[test]
    fn test_intent_mode_round_trip() {
        assert_eq!("rule".parse::<IntentMode>(), Ok(IntentMode::Rule));
        assert_eq!(" LLM ".parse::<IntentMode>(), Ok(IntentMode::Llm));
        assert!("auto".parse::<IntentMode>().is_err());
        assert_eq!(IntentMode::Llm.to_string(), "llm");
        assert_eq!(IntentMode::default(), IntentMode::Rule);
    }

    #[test]
    fn test_decision_constructors() {
        let decision = RouteDecision::knowledge("代码规范", "keyword");
        assert_eq!(decision.route.kind(), "knowledge");
        assert_eq!(decision.source, DecisionSource::Rule);
        assert_eq!(decision.confidence, RULE_CONFIDENCE);

        let decision = RouteDecision::general("greeting").from_llm(1.7);
        assert_eq!(decision.source, DecisionSource::Llm);
        assert_eq!(decision.confidence, 1.0);
    }

    #[test]
    fn test_decision_serializes_tagged() {
        let registry = ToolRegistry::new();
        let tool = registry.get("get_company_info").unwrap().clone();
        let decision = RouteDecision::tool(tool, ToolParams::new(), "matched");
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["route"], "tool");
        assert_eq!(json["tool"]["name"], "get_company_info");
        assert_eq!(json["source"], "rule");
    }

    #[test]
    fn test_extract_json_raw() {
        let completion = r#"{"needs_retrieval": true, "reason": "x"}"#;
        assert_eq!(extract_json_from_completion(completion).unwrap(), completion);
    }

    #[test]
    fn test_extract_json_fenced() {
        let completion = "Here you go:\n```json\n{\"needs_retrieval\": false}\n```";
        assert_eq!(
            extract_json_from_completion(completion).unwrap(),
            "{\"needs_retrieval\": false}"
        );

        let completion = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json_from_completion(completion).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_json_embedded() {
        let completion = "分析结果如下 {\"needs_retrieval\": true, \"reason\": \"技术问题\"} 谢谢";
        assert_eq!(
            extract_json_from_completion(completion).unwrap(),
            "{\"needs_retrieval\": true, \"reason\": \"技术问题\"}"
        );
    }

    #[test]
    fn test_extract_json_missing() {
        let err = extract_json_from_completion("no json here").unwrap_err();
        assert!(err.contains("No JSON found"));
    }
}

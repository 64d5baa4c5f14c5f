//! LLM-backed knowledge check.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::extract_json_from_completion;
use crate::error::ClassificationError;
use crate::llm::{ChatBackend, ChatRequest};
use crate::prompts::INTENT_TEMPLATE;

/// Classifier reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResponse {
    /// Whether the knowledge base should be searched.
    pub needs_retrieval: bool,
    /// Model explanation.
    pub reason: String,
    /// Model confidence, if given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl IntentResponse {
    /// Parse a completion strictly; any deviation is an error.
    pub fn from_completion(completion: &str) -> Result<Self, ClassificationError> {
        let json = extract_json_from_completion(completion).map_err(|_| {
            ClassificationError::NoJson {
                preview: completion.chars().take(200).collect(),
            }
        })?;

        serde_json::from_str::<IntentResponse>(json).map_err(|e| {
            ClassificationError::InvalidShape {
                message: format!(
                    "{} | Response preview: {}",
                    e,
                    json.chars().take(200).collect::<String>()
                ),
            }
        })
    }
}

/// Asks the intent model whether a query needs retrieval
#[derive(Clone)]
pub struct LlmIntentClassifier {
    chat: Arc<dyn ChatBackend>,
}

impl LlmIntentClassifier {
    /// Create a classifier over a chat backend
    pub fn new(chat: Arc<dyn ChatBackend>) -> Self {
        Self { chat }
    }

    /// Classify a query.
    pub async fn classify(&self, query: &str) -> Result<IntentResponse, ClassificationError> {
        let start = Instant::now();
        let messages = INTENT_TEMPLATE.render(&[("input", query)], &[]);

        let completion = self
            .chat
            .invoke(ChatRequest::new(messages).for_intent())
            .await?;

        debug!(completion = %completion, "Intent classifier raw response");

        let response = IntentResponse::from_completion(&completion)?;

        info!(
            needs_retrieval = response.needs_retrieval,
            reason = %response.reason,
            latency_ms = start.elapsed().as_millis(),
            "LLM intent classification completed"
        );

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use crate::llm::{MockChatBackend, ModelRole};

    #[test]
    fn test_from_completion_valid() {
        let parsed = IntentResponse::from_completion(
            r#"{"needs_retrieval": true, "reason": "技术问题", "confidence": 0.9}"#,
        )
        .unwrap();
        assert!(parsed.needs_retrieval);
        assert_eq!(parsed.confidence, Some(0.9));
    }

    #[test]
    fn test_from_completion_without_confidence() {
        let parsed =
            IntentResponse::from_completion(r#"{"needs_retrieval": false, "reason": "闲聊"}"#)
                .unwrap();
        assert!(!parsed.needs_retrieval);
        assert_eq!(parsed.confidence, None);
    }

    #[test]
    fn test_from_completion_wrong_type() {
        let err =
            IntentResponse::from_completion(r#"{"needs_retrieval": "yes", "reason": "x"}"#)
                .unwrap_err();
        assert!(matches!(err, ClassificationError::InvalidShape { .. }));
    }

    #[test]
    fn test_from_completion_missing_reason() {
        let err = IntentResponse::from_completion(r#"{"needs_retrieval": true}"#).unwrap_err();
        assert!(matches!(err, ClassificationError::InvalidShape { .. }));
    }

    #[test]
    fn test_from_completion_no_json() {
        let err = IntentResponse::from_completion("I think it needs retrieval").unwrap_err();
        assert!(matches!(err, ClassificationError::NoJson { .. }));
    }

    #[tokio::test]
    async fn test_classify_uses_intent_model() {
        let mut chat = MockChatBackend::new();
        chat.expect_invoke()
            .withf(|request| {
                request.model == ModelRole::Intent
                    && request.last_user_content() == Some("用户问题：代码规范是什么")
            })
            .times(1)
            .returning(|_| Ok(r#"{"needs_retrieval": true, "reason": "规范"}"#.to_string()));

        let classifier = LlmIntentClassifier::new(Arc::new(chat));
        let response = classifier.classify("代码规范是什么").await.unwrap();
        assert!(response.needs_retrieval);
    }

    #[tokio::test]
    async fn test_classify_backend_error() {
        let mut chat = MockChatBackend::new();
        chat.expect_invoke()
            .returning(|_| Err(ChatError::Timeout { timeout_ms: 10 }));

        let classifier = LlmIntentClassifier::new(Arc::new(chat));
        let err = classifier.classify("anything").await.unwrap_err();
        assert!(matches!(err, ClassificationError::Backend(_)));
    }
}

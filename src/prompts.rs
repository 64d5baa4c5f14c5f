//! Centralized prompt definitions for the chat paths and the intent classifier
//!
//! Human templates use `{name}` slots filled by [`PromptTemplate::render`].

use crate::llm::Message;

/// System prompt for general conversation.
pub const GENERAL_SYSTEM_PROMPT: &str = "你是一个友好的AI助手，回答通用问题。";

/// System prompt for knowledge-grounded answers.
pub const RAG_SYSTEM_PROMPT: &str = "你是一个AI助手，会根据知识库内容进行回答。";

/// Human template for knowledge-grounded answers. Slots: `input`, `docs`.
pub const RAG_HUMAN_TEMPLATE: &str = "用户问题：{input}\n检索到的知识：\n{docs}\n\n请结合知识库内容回答用户问题。如果知识库中没有相关信息，请基于你的知识回答。";

/// Human template for summarizing a tool result. Slots: `input`, `tool_result`.
pub const TOOL_SUMMARY_TEMPLATE: &str = "用户问题：{input}\n工具调用结果：{tool_result}\n\n请基于以上工具调用结果，对用户的问题进行回答或总结。";

/// System prompt for LLM intent classification.
///
/// The reply must be a single JSON object with a boolean `needs_retrieval`.
pub const INTENT_SYSTEM_PROMPT: &str = r#"你是一个意图分类器。请分析用户问题是否需要检索知识库来回答。

知识库内容：公司开发规范、代码示例、技术文档等。

请严格按照以下JSON格式回答，不要添加任何额外文字：
{"needs_retrieval": true, "reason": "原因说明", "confidence": 0.9}
或者
{"needs_retrieval": false, "reason": "原因说明", "confidence": 0.9}"#;

/// Human template for LLM intent classification. Slot: `input`.
pub const INTENT_HUMAN_TEMPLATE: &str = "用户问题：{input}";

/// Placeholder shown in place of documents when retrieval finds nothing.
pub const NO_DOCUMENTS_PLACEHOLDER: &str = "（未检索到相关知识）";

/// Notice emitted when retrieval fails and the general path answers instead.
pub const RETRIEVAL_FAILED_NOTICE: &str = "（知识库检索失败，将基于通用知识回答）";

/// Notice emitted when the model streams nothing.
pub const EMPTY_RESPONSE_NOTICE: &str = "（AI没有生成响应）";

/// Prefix of the message emitted when a tool call fails.
pub const TOOL_FAILED_PREFIX: &str = "工具调用失败";

/// A system prompt, an optional history slot and a human template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    /// System prompt.
    pub system: &'static str,
    /// Human turn with `{slot}` placeholders.
    pub human: &'static str,
    /// Insert session history between the two.
    pub include_history: bool,
}

/// General conversation: system prompt, history, raw input.
pub const GENERAL_TEMPLATE: PromptTemplate = PromptTemplate {
    system: GENERAL_SYSTEM_PROMPT,
    human: "{input}",
    include_history: true,
};

/// Knowledge-grounded conversation.
pub const RAG_TEMPLATE: PromptTemplate = PromptTemplate {
    system: RAG_SYSTEM_PROMPT,
    human: RAG_HUMAN_TEMPLATE,
    include_history: true,
};

/// Tool result wrap-up.
pub const TOOL_SUMMARY: PromptTemplate = PromptTemplate {
    system: GENERAL_SYSTEM_PROMPT,
    human: TOOL_SUMMARY_TEMPLATE,
    include_history: true,
};

/// Intent classification. Never sees history.
pub const INTENT_TEMPLATE: PromptTemplate = PromptTemplate {
    system: INTENT_SYSTEM_PROMPT,
    human: INTENT_HUMAN_TEMPLATE,
    include_history: false,
};

impl PromptTemplate {
    /// Fill the human template and assemble the message list.
    ///
    /// Slots with no matching variable are left untouched. Substitution is a
    /// single pass, so slot-like text inside a value is not expanded again.
    pub fn render(&self, vars: &[(&str, &str)], history: &[Message]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.system));
        if self.include_history {
            messages.extend(history.iter().cloned());
        }
        messages.push(Message::user(fill(self.human, vars)));
        messages
    }
}

fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

//! Keyword classifier: general conversation or knowledge retrieval.

use serde::Serialize;

/// Coarse outcome of classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    /// Answer directly.
    General,
    /// Answer from retrieved documents.
    Knowledge,
}

/// Classifier verdict with its justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Chosen route.
    pub kind: RouteKind,
    /// Table that matched, if any.
    pub category: Option<String>,
    /// Why it was chosen.
    pub reason: String,
}

/// Phrase tables that mark a query as general conversation, scanned in order.
pub const GENERAL_QUESTIONS: &[(&str, &[&str])] = &[
    (
        "greetings",
        &["你好", "hi", "hello", "嗨", "早上好", "下午好", "晚上好", "hey"],
    ),
    ("farewells", &["再见", "拜拜", "bye", "goodbye", "see you"]),
    ("thanks", &["谢谢", "thanks", "thank you", "thx"]),
    (
        "smalltalk",
        &["你好吗", "how are you", "最近怎么样", "what's up"],
    ),
    (
        "system",
        &["你是谁", "你是什么", "what are you", "who are you"],
    ),
    (
        "capabilities",
        &["你能做什么", "what can you do", "你的功能", "你的能力"],
    ),
    (
        "time",
        &["现在几点", "what time is it", "今天星期几", "几号"],
    ),
    ("weather", &["天气", "weather", "下雨", "sunny"]),
    ("math", &["计算", "calculate", "算一下", "1+1", "数学"]),
];

/// Domain words that call for retrieval.
pub const KNOWLEDGE_KEYWORDS: &[&str] = &[
    "代码", "规范", "规则", "流程", "开发", "测试", "文档", "函数", "方法", "类", "模块", "系统",
    "架构", "如何", "怎样", "为什么", "原因", "解决方案", "建议", "公司", "项目", "产品", "服务",
    "技术", "定义", "说明", "解释", "介绍", "描述",
];

/// Interrogatives that tip a longer query toward retrieval.
pub const QUESTION_WORDS: &[&str] = &[
    "什么", "怎么", "如何", "为什么", "何时", "哪里", "谁", "哪些",
];

/// All tables and thresholds the keyword classifier uses.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Social phrase tables, scanned in order.
    pub general: &'static [(&'static str, &'static [&'static str])],
    /// Words that call for retrieval.
    pub knowledge_keywords: &'static [&'static str],
    /// Interrogatives for longer queries.
    pub question_words: &'static [&'static str],
    /// Queries with at most this many whitespace-separated words are general.
    pub short_query_words: usize,
    /// Require ASCII social phrases to sit on word boundaries, so "hi" no
    /// longer fires inside "this". Off by default: plain substring matching.
    pub ascii_word_boundaries: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            general: GENERAL_QUESTIONS,
            knowledge_keywords: KNOWLEDGE_KEYWORDS,
            question_words: QUESTION_WORDS,
            short_query_words: 3,
            ascii_word_boundaries: false,
        }
    }
}

impl ClassifierConfig {
    /// Classify a query. Never fails.
    pub fn classify(&self, query: &str) -> Classification {
        let query = query.trim().to_lowercase();

        if query.is_empty() {
            return general(None, "empty query");
        }

        for (category, phrases) in self.general {
            if let Some(phrase) = phrases
                .iter()
                .find(|p| contains_phrase(&query, p, self.ascii_word_boundaries))
            {
                return general(
                    Some(*category),
                    format!("matched {} phrase \"{}\"", category, phrase),
                );
            }
        }

        if let Some(keyword) = self
            .knowledge_keywords
            .iter()
            .find(|k| query.contains(*k))
        {
            return Classification {
                kind: RouteKind::Knowledge,
                category: Some("knowledge".to_string()),
                reason: format!("matched knowledge keyword \"{}\"", keyword),
            };
        }

        let words = query.split_whitespace().count();
        if words <= self.short_query_words {
            return general(None, format!("short query ({} words)", words));
        }

        if self.question_words.iter().any(|w| query.contains(w)) {
            return knowledge("question word in a longer query");
        }

        knowledge(format!("medium-length query ({} words) defaults to retrieval", words))
    }
}

/// Classify with the built-in tables.
pub fn classify(query: &str) -> Classification {
    ClassifierConfig::default().classify(query)
}

fn general(category: Option<&str>, reason: impl Into<String>) -> Classification {
    Classification {
        kind: RouteKind::General,
        category: category.map(str::to_string),
        reason: reason.into(),
    }
}

fn knowledge(reason: impl Into<String>) -> Classification {
    Classification {
        kind: RouteKind::Knowledge,
        category: None,
        reason: reason.into(),
    }
}

/// Substring match, optionally restricted to word boundaries for ASCII phrases.
fn contains_phrase(haystack: &str, phrase: &str, word_boundaries: bool) -> bool {
    if !word_boundaries || !phrase.is_ascii() {
        return haystack.contains(phrase);
    }

    haystack.match_indices(phrase).any(|(start, matched)| {
        let end = start + matched.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(|c| c.is_ascii_alphanumeric())
            && !after.is_some_and(|c| c.is_ascii_alphanumeric())
    })
}

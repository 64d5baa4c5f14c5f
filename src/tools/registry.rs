//! Tool registry, the tool gate and the keyword scorer.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, error};

use super::builtins::builtin_tools;
use super::{ToolCategory, ToolDescriptor};

/// Scoring keywords per tool category. Every entry also opens the tool gate.
pub const TOOL_KEYWORDS: &[(ToolCategory, &[&str])] = &[
    (
        ToolCategory::Calculation,
        &[
            "计算", "算", "等于", "加", "减", "乘", "除", "平方", "开方", "sin", "cos", "tan",
            "表达式",
        ],
    ),
    (
        ToolCategory::Conversion,
        &[
            "转换", "换算", "等于多少", "摄氏度", "华氏度", "米", "英尺", "公里", "英里", "美元",
            "人民币", "celsius", "fahrenheit", "meters", "feet", "kilometers", "miles", "usd",
            "cny",
        ],
    ),
    (
        ToolCategory::DataQuery,
        &[
            "用户", "员工", "项目", "任务", "公司", "部门", "信息", "列表", "查询", "查找", "搜索",
        ],
    ),
    (
        ToolCategory::System,
        &["状态", "运行", "健康", "内存", "性能", "系统"],
    ),
];

/// Query word → tool-name fragment pairs worth [`ANCHOR_BONUS`].
const DOMAIN_ANCHORS: &[(&str, &str)] = &[
    ("公司", "company"),
    ("用户", "user"),
    ("项目", "project"),
    ("任务", "task"),
];

const NAME_BONUS: u32 = 5;
const DESCRIPTION_TOKEN_BONUS: u32 = 1;
const KEYWORD_BONUS: u32 = 2;
const ANCHOR_BONUS: u32 = 3;
const EXPRESSION_BONUS: u32 = 10;

static ARITHMETIC: LazyLock<Regex> = LazyLock::new(|| regex(r"\d+\s*[+\-*/]\s*\d+"));

static ID_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?:id|编号)\s*[:：是为=]?\s*\d+"));

static GATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        ARITHMETIC.clone(),
        regex(r"等于\s*\d+"),
        regex(r"calculate|calc"),
        regex(r"convert|换算|转换"),
    ]
});

pub(crate) fn regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        // Patterns are literals in this crate; a failure here is a typo.
        Err(e) => panic!("invalid built-in pattern {pattern:?}: {e}"),
    }
}

/// Keywords of one category.
pub fn category_keywords(category: ToolCategory) -> &'static [&'static str] {
    TOOL_KEYWORDS
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, keywords)| *keywords)
        .unwrap_or(&[])
}

/// Registry of invocable tools.
///
/// Populated once at startup and read-only afterwards. Iteration follows
/// registration order, which is also the selector's tie-break order.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a registry with the built-in tools.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for tool in builtin_tools() {
            let name = tool.name.clone();
            if let Err(e) = registry.register(tool) {
                error!(
                    tool = %name,
                    error = %e,
                    "Failed to register builtin tool - this indicates a programming error"
                );
            }
        }
        registry
    }

    /// Create a registry with no tools.
    pub fn empty() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool.
    ///
    /// # Errors
    /// Returns error if the name is empty or already registered.
    pub fn register(&mut self, tool: ToolDescriptor) -> Result<(), String> {
        if tool.name.is_empty() {
            return Err("Tool name is required".to_string());
        }
        if self.index.contains_key(&tool.name) {
            return Err(format!("Tool '{}' already exists", tool.name));
        }

        self.index.insert(tool.name.clone(), self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// All tools in registration order.
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tool is registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Cheap check for whether a query might want a tool at all.
    pub fn should_use_tool(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();

        for (category, keywords) in TOOL_KEYWORDS {
            if let Some(keyword) = keywords.iter().find(|k| query.contains(*k)) {
                debug!(keyword = %keyword, category = %category, "Tool keyword detected");
                return true;
            }
        }

        if GATE_PATTERNS.iter().any(|re| re.is_match(&query)) {
            debug!("Calculation or conversion pattern detected");
            return true;
        }

        false
    }

    /// Score one tool against a query.
    pub fn score(&self, query: &str, tool: &ToolDescriptor) -> u32 {
        score_normalized(&query.trim().to_lowercase(), tool)
    }

    /// Pick the highest-scoring tool; ties go to the earliest registered.
    ///
    /// An arithmetic expression in the query selects the first calculation
    /// tool regardless of the other scores.
    pub fn select_tool(&self, query: &str) -> Option<&ToolDescriptor> {
        let query = query.trim().to_lowercase();

        if ARITHMETIC.is_match(&query) {
            if let Some(tool) = self
                .tools
                .iter()
                .find(|t| t.category == ToolCategory::Calculation)
            {
                debug!(tool = %tool.name, "Arithmetic expression selects calculation tool");
                return Some(tool);
            }
        }

        let mut best: Option<(&ToolDescriptor, u32)> = None;

        for tool in &self.tools {
            let score = score_normalized(&query, tool);
            if score == 0 {
                continue;
            }
            debug!(tool = %tool.name, score, "Tool scored");
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((tool, score));
            }
        }

        best.map(|(tool, _)| tool)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn score_normalized(query: &str, tool: &ToolDescriptor) -> u32 {
    let mut score = 0;

    let spoken_name = tool.name.to_lowercase().replace('_', " ");
    if query.contains(&spoken_name) {
        score += NAME_BONUS;
    }

    let description = tool.description.to_lowercase();
    for word in query.split_whitespace() {
        if word.chars().count() > 2 && description.contains(word) {
            score += DESCRIPTION_TOKEN_BONUS;
        }
    }

    for keyword in category_keywords(tool.category) {
        if query.contains(keyword) {
            score += KEYWORD_BONUS;
        }
    }

    for (word, fragment) in DOMAIN_ANCHORS {
        if query.contains(word) && tool.name.contains(fragment) {
            score += ANCHOR_BONUS;
        }
    }

    if tool.category == ToolCategory::Calculation && ARITHMETIC.is_match(query) {
        score += EXPRESSION_BONUS;
    }

    if tool.name.ends_with("_by_id") && ID_REFERENCE.is_match(query) {
        score += ANCHOR_BONUS;
    }

    score
}

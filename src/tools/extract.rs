//! Regex-driven parameter extraction, one parser per tool.

use std::sync::LazyLock;

use regex::Regex;

use super::registry::regex;
use super::{ParamValue, ToolDescriptor, ToolParams};

type Parser = fn(&str) -> ToolParams;

/// Tool name → parser. Tools without an entry take no parameters.
const PARSERS: &[(&str, Parser)] = &[
    ("calculate", parse_calculate),
    ("convert", parse_convert),
    ("get_users", parse_user_name),
    ("get_user_by_id", parse_user_id),
    ("get_projects", parse_project_status),
    ("get_tasks", parse_task_filters),
];

/// Extract call arguments for `tool` from the raw query.
pub fn extract_params(query: &str, tool: &ToolDescriptor) -> ToolParams {
    PARSERS
        .iter()
        .find(|(name, _)| *name == tool.name)
        .map(|(_, parse)| parse(query.trim()))
        .unwrap_or_default()
}

/// First required parameter of `tool` that `params` lacks.
pub fn missing_required(tool: &ToolDescriptor, params: &ToolParams) -> Option<String> {
    tool.required_params()
        .find(|name| params.get(*name).map_or(true, ParamValue::is_empty))
        .map(str::to_string)
}

// ============================================================================
// calculate
// ============================================================================

static CALC_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)(?:计算|等于)?\s*(?:math\.)?(sin|cos|tan|sqrt|log)\s*\(([^)]+)\)")
});

static CALC_WITH_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?:计算|等于|算)?\s*([\d+\-*/.\s()]+)\s*(?:等于|结果|是多少|$)")
});

static CALC_BARE: LazyLock<Regex> = LazyLock::new(|| regex(r"[\d+\-*/.\s()]+"));

static NON_MATH: LazyLock<Regex> = LazyLock::new(|| regex(r"[^0-9+\-*/().^\s]"));

fn has_digit(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_digit())
}

fn parse_calculate(query: &str) -> ToolParams {
    let mut params = ToolParams::new();
    if let Some(expression) = calculation_expression(query) {
        params.insert("expression".to_string(), ParamValue::Text(expression));
    }
    params
}

fn calculation_expression(query: &str) -> Option<String> {
    if let Some(caps) = CALC_FUNCTION.captures(query) {
        let func = caps[1].to_lowercase();
        return Some(format!("{}({})", func, caps[2].trim()));
    }

    let with_keyword = CALC_WITH_KEYWORD
        .captures_iter(query)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .find(|s| has_digit(s));
    if let Some(expression) = with_keyword {
        return Some(expression.to_string());
    }

    if let Some(expression) = CALC_BARE
        .find_iter(query)
        .map(|m| m.as_str().trim())
        .find(|s| has_digit(s))
    {
        return Some(expression.to_string());
    }

    let stripped = NON_MATH.replace_all(query, "");
    let stripped = stripped.trim();
    has_digit(stripped).then(|| stripped.to_string())
}

// ============================================================================
// convert
// ============================================================================

/// Unit spelling → canonical unit accepted by the conversion endpoint.
const UNIT_ALIASES: &[(&str, &str)] = &[
    ("摄氏度", "celsius"),
    ("摄氏", "celsius"),
    ("℃", "celsius"),
    ("°c", "celsius"),
    ("celsius", "celsius"),
    ("华氏度", "fahrenheit"),
    ("华氏", "fahrenheit"),
    ("℉", "fahrenheit"),
    ("°f", "fahrenheit"),
    ("fahrenheit", "fahrenheit"),
    ("米", "meters"),
    ("meters", "meters"),
    ("meter", "meters"),
    ("m", "meters"),
    ("英尺", "feet"),
    ("feet", "feet"),
    ("foot", "feet"),
    ("ft", "feet"),
    ("公里", "kilometers"),
    ("千米", "kilometers"),
    ("kilometers", "kilometers"),
    ("kilometer", "kilometers"),
    ("km", "kilometers"),
    ("英里", "miles"),
    ("miles", "miles"),
    ("mile", "miles"),
    ("mi", "miles"),
    ("美元", "usd"),
    ("usd", "usd"),
    ("dollars", "usd"),
    ("dollar", "usd"),
    ("$", "usd"),
    ("人民币", "cny"),
    ("元", "cny"),
    ("cny", "cny"),
    ("rmb", "cny"),
    ("yuan", "cny"),
    ("¥", "cny"),
    ("￥", "cny"),
];

/// Target used when the query names only the source unit.
const DEFAULT_TARGETS: &[(&str, &str)] = &[
    ("celsius", "fahrenheit"),
    ("fahrenheit", "celsius"),
    ("meters", "feet"),
    ("feet", "meters"),
    ("kilometers", "miles"),
    ("miles", "kilometers"),
    ("usd", "cny"),
    ("cny", "usd"),
];

// Alternations are ordered longest-first so "千米" beats "米" and "km" beats "m".
const UNIT_WORDS: &str = r"摄氏度|摄氏|华氏度|华氏|英尺|公里|千米|英里|美元|人民币|米|元|℃|℉|°c|°f|celsius|fahrenheit|kilometers?|km|meters?|miles?|mi|feet|foot|ft|usd|dollars?|cny|rmb|yuan";

static CONVERT_VALUE_UNIT: LazyLock<Regex> =
    LazyLock::new(|| regex(&format!(r"(\d+(?:\.\d+)?)\s*({})", UNIT_WORDS)));

static UNIT_WORD: LazyLock<Regex> = LazyLock::new(|| regex(UNIT_WORDS));

static CONVERT_EXPLICIT: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"(\d+(?:\.\d+)?)\s*([a-z$¥￥°℃℉]+)\s*(?:到|转为|转换为|转成|换成|换算成|等于多少|to|in)\s*([a-z$¥￥°℃℉]+)",
    )
});

static CONVERT_COMPACT: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(\d+(?:\.\d+)?)(摄氏度|华氏度|英尺|公里|英里|美元|人民币|米|°c|°f|km|ft|mi|m|\$|¥|￥)")
});

static FIRST_NUMBER: LazyLock<Regex> = LazyLock::new(|| regex(r"\d+(?:\.\d+)?"));

fn canonical_unit(unit: &str) -> String {
    let unit = unit.trim().to_lowercase();
    UNIT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == unit)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(unit)
}

fn default_target(from: &str) -> Option<&'static str> {
    DEFAULT_TARGETS
        .iter()
        .find(|(source, _)| *source == from)
        .map(|(_, target)| *target)
}

fn parse_convert(query: &str) -> ToolParams {
    let lowered = query.to_lowercase();
    let mut params = ToolParams::new();

    let (value, from, to) = if let Some(caps) = CONVERT_VALUE_UNIT.captures(&lowered) {
        let from = canonical_unit(&caps[2]);
        let rest = &lowered[caps.get(0).map_or(0, |m| m.end())..];
        let explicit = UNIT_WORD
            .find_iter(rest)
            .map(|m| canonical_unit(m.as_str()))
            .find(|unit| *unit != from);
        let to = explicit.or_else(|| default_target(&from).map(str::to_string));
        (caps[1].parse::<f64>().ok(), Some(from), to)
    } else if let Some(caps) = CONVERT_EXPLICIT.captures(&lowered) {
        (
            caps[1].parse::<f64>().ok(),
            Some(canonical_unit(&caps[2])),
            Some(canonical_unit(&caps[3])),
        )
    } else if let Some(caps) = CONVERT_COMPACT.captures(&lowered) {
        let from = canonical_unit(&caps[2]);
        let to = default_target(&from).map(str::to_string);
        (caps[1].parse::<f64>().ok(), Some(from), to)
    } else {
        let value = FIRST_NUMBER
            .find(&lowered)
            .and_then(|m| m.as_str().parse::<f64>().ok());
        (value, None, None)
    };

    if let Some(value) = value {
        params.insert("value".to_string(), ParamValue::Number(value));
    }
    if let Some(from) = from {
        params.insert("from".to_string(), ParamValue::Text(from));
    }
    if let Some(to) = to {
        params.insert("to".to_string(), ParamValue::Text(to));
    }
    params
}

// ============================================================================
// data queries
// ============================================================================

static NAME_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?:叫|名为|姓名[是为:：]?)\s*([\p{Han}&&[^的是吗呢和]]{2,3}|[A-Za-z][A-Za-z0-9_]*)")
});

static NAME_AFTER_ROLE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?:用户|员工|同事)\s*([A-Za-z][A-Za-z0-9_]*)"));

static NAME_BEFORE_INFO: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?:用户|员工|同事|查询|查找|搜索|查看)?([\p{Han}&&[^的是吗呢和]]{2,3})的(?:信息|资料|详情)")
});

static USER_ID: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)(?:id|编号)\s*[:：是为=]?\s*(\d+)"));

static USER_ID_ORDINAL: LazyLock<Regex> = LazyLock::new(|| regex(r"(\d+)\s*号(?:用户|员工)"));

static PRIORITY_AFTER: LazyLock<Regex> =
    LazyLock::new(|| regex(r"优先级\s*(?:为|是)?\s*([高中低])"));

static ASSIGNEE: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?:分配给|由)\s*(\p{Han}{1,4}?|[A-Za-z][A-Za-z0-9_]*)\s*(?:负责|处理)")
});

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| regex(r#"[「“"'《]([^」”"'》]+)[」”"'》]"#));

fn parse_user_name(query: &str) -> ToolParams {
    let mut params = ToolParams::new();
    let name = [&*NAME_MARKER, &*NAME_AFTER_ROLE, &*NAME_BEFORE_INFO]
        .iter()
        .find_map(|re| re.captures(query).map(|caps| caps[1].to_string()));
    if let Some(name) = name {
        params.insert("name".to_string(), ParamValue::Text(name));
    }
    params
}

fn parse_user_id(query: &str) -> ToolParams {
    let mut params = ToolParams::new();
    let id = USER_ID
        .captures(query)
        .or_else(|| USER_ID_ORDINAL.captures(query))
        .and_then(|caps| caps[1].parse::<f64>().ok());
    if let Some(id) = id {
        params.insert("id".to_string(), ParamValue::Number(id));
    }
    params
}

fn parse_project_status(query: &str) -> ToolParams {
    let mut params = ToolParams::new();
    if let Some(status) = ["进行中", "已完成", "计划中"]
        .into_iter()
        .find(|s| query.contains(s))
    {
        params.insert("status".to_string(), ParamValue::from(status));
    }
    params
}

fn parse_task_filters(query: &str) -> ToolParams {
    let mut params = ToolParams::new();

    let priority = [("高优先级", "高"), ("中优先级", "中"), ("低优先级", "低")]
        .into_iter()
        .find(|(phrase, _)| query.contains(phrase))
        .map(|(_, level)| level.to_string())
        .or_else(|| PRIORITY_AFTER.captures(query).map(|caps| caps[1].to_string()));
    if let Some(priority) = priority {
        params.insert("priority".to_string(), ParamValue::Text(priority));
    }

    if let Some(caps) = ASSIGNEE.captures(query) {
        params.insert("assignee".to_string(), ParamValue::from(&caps[1]));
    }

    if let Some(caps) = QUOTED.captures(query) {
        params.insert("project".to_string(), ParamValue::from(caps[1].trim()));
    }

    params
}

//! Tool descriptors, selection, parameter extraction and execution.
//!
//! The registry holds the nine built-in tools in registration order. A query
//! reaches a tool only when the cheap [`ToolRegistry::should_use_tool`] gate
//! fires, [`ToolRegistry::select_tool`] finds a positive-scoring match and
//! [`extract_params`] yields every required parameter.

mod builtins;
pub mod calc;
mod executor;
mod extract;
mod format;
mod registry;

pub use builtins::builtin_tools;
pub use executor::{HealthStatus, HttpToolExecutor, ToolExecutor};
#[cfg(test)]
pub use executor::MockToolExecutor;
pub use extract::{extract_params, missing_required};
pub use format::format_tool_result;
pub use registry::{ToolRegistry, TOOL_KEYWORDS};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tool category; each has its own scoring keyword table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    /// Arithmetic evaluation.
    Calculation,
    /// Unit and currency conversion.
    Conversion,
    /// Company data lookups.
    DataQuery,
    /// Backend status.
    System,
}

impl ToolCategory {
    /// Get the category name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::Calculation => "calculation",
            ToolCategory::Conversion => "conversion",
            ToolCategory::DataQuery => "data_query",
            ToolCategory::System => "system",
        }
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Declared type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Numeric value.
    Number,
    /// Free text.
    String,
}

/// One entry of a tool's parameter schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name, also the query-string key.
    pub name: String,
    /// Declared type.
    pub kind: ParamType,
    /// Whether the route is abandoned when extraction misses it.
    pub required: bool,
    /// Human-readable description.
    pub description: String,
}

impl ParamSpec {
    /// Create a required parameter
    pub fn required(name: &str, kind: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
        }
    }

    /// Create an optional parameter
    pub fn optional(name: &str, kind: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// An invocable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique name.
    pub name: String,
    /// Category driving keyword scoring.
    pub category: ToolCategory,
    /// Description, also matched against query tokens.
    pub description: String,
    /// Parameter schema in declaration order.
    pub parameters: Vec<ParamSpec>,
    /// Backend path; `{param}` segments are filled from the call parameters.
    pub endpoint: String,
}

impl ToolDescriptor {
    /// Create a descriptor with no parameters
    pub fn new(name: &str, category: ToolCategory, description: &str, endpoint: &str) -> Self {
        Self {
            name: name.to_string(),
            category,
            description: description.to_string(),
            parameters: Vec::new(),
            endpoint: endpoint.to_string(),
        }
    }

    /// Add a parameter to the schema
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.parameters.push(param);
        self
    }

    /// Names of the required parameters
    pub fn required_params(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }
}

/// An extracted parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Numeric value.
    Number(f64),
    /// Text value.
    Text(String),
}

impl ParamValue {
    /// Whether the value carries nothing worth sending
    pub fn is_empty(&self) -> bool {
        match self {
            ParamValue::Number(n) => !n.is_finite(),
            ParamValue::Text(s) => s.trim().is_empty(),
        }
    }

    /// Numeric view of the value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(n) => write!(f, "{}", format_number(*n)),
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

/// Extracted call arguments, keyed by parameter name.
pub type ToolParams = BTreeMap<String, ParamValue>;

/// Successful tool call payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Name of the tool that produced the data.
    pub tool: String,
    /// The `data` field of the backend envelope.
    pub data: serde_json::Value,
    /// Item count reported by list endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// Render a number without a trailing `.0` when it is integral.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

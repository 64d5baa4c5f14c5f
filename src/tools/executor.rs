use std::sync::LazyLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use super::registry::regex;
use super::{ToolDescriptor, ToolOutput, ToolParams};
use crate::config::{RequestConfig, ToolApiConfig};
use crate::error::{ToolError, ToolResult};

static PATH_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| regex(r"\{(\w+)\}"));

/// Invokes tools.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Call `tool` with `params` and return its data payload.
    async fn execute(&self, tool: &ToolDescriptor, params: &ToolParams) -> ToolResult<ToolOutput>;
}

/// Tool backend health report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Backend status, e.g. `healthy`.
    pub status: String,
    /// Backend version.
    pub version: String,
}

/// Response envelope shared by every tool endpoint
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    count: Option<usize>,
    #[serde(default)]
    message: Option<String>,
}

/// Executes tools as GET requests against the tool backend
#[derive(Clone)]
pub struct HttpToolExecutor {
    client: Client,
    base_url: String,
    request_config: RequestConfig,
}

impl HttpToolExecutor {
    /// Create a new executor
    pub fn new(config: &ToolApiConfig, request_config: RequestConfig) -> ToolResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(ToolError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_config,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query the backend's `/health` endpoint
    pub async fn health(&self) -> ToolResult<HealthStatus> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Api {
                tool: "health".to_string(),
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ToolError::InvalidResponse {
                message: format!("Failed to parse health response: {}", e),
            })
    }

    fn map_send_error(&self, e: reqwest::Error) -> ToolError {
        if e.is_timeout() {
            ToolError::Timeout {
                timeout_ms: self.request_config.timeout_ms,
            }
        } else {
            ToolError::Http(e)
        }
    }

    /// Resolve the endpoint path and the remaining query-string pairs
    pub fn build_request(
        &self,
        tool: &ToolDescriptor,
        params: &ToolParams,
    ) -> ToolResult<(String, Vec<(String, String)>)> {
        let mut used = Vec::new();
        let mut path = tool.endpoint.clone();

        for caps in PATH_PLACEHOLDER.captures_iter(&tool.endpoint) {
            let name = &caps[1];
            let value = params
                .get(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ToolError::MissingPathParam {
                    tool: tool.name.clone(),
                    param: name.to_string(),
                })?;
            path = path.replace(&caps[0], &value.to_string());
            used.push(name.to_string());
        }

        let query = params
            .iter()
            .filter(|(key, value)| !used.contains(key) && !value.is_empty())
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect();

        Ok((format!("{}{}", self.base_url, path), query))
    }

    async fn call(&self, tool: &ToolDescriptor, params: &ToolParams) -> ToolResult<ToolOutput> {
        let (url, query) = self.build_request(tool, params)?;

        debug!(tool = %tool.name, url = %url, params = query.len(), "Calling tool endpoint");

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;
        let envelope = serde_json::from_str::<Envelope>(&body).ok();

        if let Some(Envelope {
            success: Some(false),
            message,
            ..
        }) = &envelope
        {
            return Err(ToolError::Rejected {
                tool: tool.name.clone(),
                message: message.clone().unwrap_or_else(|| "未知错误".to_string()),
            });
        }

        if !status.is_success() {
            return Err(ToolError::Api {
                tool: tool.name.clone(),
                status: status.as_u16(),
                message: body,
            });
        }

        let raw: Value = serde_json::from_str(&body).map_err(|e| ToolError::InvalidResponse {
            message: format!("Failed to parse response from {}: {}", tool.name, e),
        })?;
        let count = envelope.as_ref().and_then(|env| env.count);
        let data = match envelope.and_then(|env| env.data) {
            Some(data) => data,
            None => raw,
        };

        Ok(ToolOutput {
            tool: tool.name.clone(),
            data,
            count,
        })
    }
}

#[async_trait]
impl ToolExecutor for HttpToolExecutor {
    async fn execute(&self, tool: &ToolDescriptor, params: &ToolParams) -> ToolResult<ToolOutput> {
        let start = Instant::now();
        let result = self.call(tool, params).await;
        let latency_ms = start.elapsed().as_millis();

        match &result {
            Ok(output) => info!(
                tool = %tool.name,
                count = ?output.count,
                latency_ms,
                "Tool call succeeded"
            ),
            Err(e) => error!(
                tool = %tool.name,
                error = %e,
                latency_ms,
                "Tool call failed"
            ),
        }

        result
    }
}

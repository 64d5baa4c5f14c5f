//! Mock tool backend.
//!
//! Serves the endpoints the built-in tools call, backed by fixed in-memory
//! data. Every endpoint answers with the `{success, data, count?}` envelope,
//! or `{success: false, message}` with a 4xx status.

mod data;

pub use data::{convert, CompanyInfo, Metrics, MockData, Project, Task, User, CONVERSIONS};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::AppError;
use crate::tools::calc;

/// Shared state for the mock handlers.
#[derive(Clone)]
pub struct MockApiState {
    /// Served records.
    pub data: Arc<MockData>,
    /// Process start time for uptime.
    pub started: Instant,
}

impl Default for MockApiState {
    fn default() -> Self {
        Self {
            data: Arc::new(MockData::default()),
            started: Instant::now(),
        }
    }
}

/// Build the router with every endpoint.
pub fn router(state: MockApiState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/users", get(list_users))
        .route("/api/users/{id}", get(get_user))
        .route("/api/users/search/{name}", get(search_users))
        .route("/api/projects", get(list_projects))
        .route("/api/projects/{id}", get(get_project))
        .route("/api/tasks", get(list_tasks))
        .route("/api/company", get(company))
        .route("/api/company/metrics", get(company_metrics))
        .route("/api/tools/calculate", get(calculate))
        .route("/api/tools/convert", get(convert_units))
        .route("/api/system/status", get(system_status))
        .with_state(state)
}

/// Bind `addr` and serve until the process ends.
pub async fn serve(addr: &str, state: MockApiState) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Internal {
            message: format!("failed to bind mock API to {addr}: {e}"),
        })?;

    info!(addr = %addr, "Mock API server listening");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| AppError::Internal {
            message: format!("mock API server error: {e}"),
        })
}

fn ok(data: impl serde::Serialize) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn ok_list<T: serde::Serialize>(items: &[T]) -> Response {
    Json(json!({ "success": true, "data": items, "count": items.len() })).into_response()
}

fn fail(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "success": false, "message": message.into() })),
    )
        .into_response()
}

/// Integral results as JSON integers, like a JavaScript backend would send.
fn number(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        json!(n as i64)
    } else {
        json!(n)
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

async fn index() -> Json<Value> {
    Json(json!({
        "message": "Mock API Server for RAG Tools Agent",
        "version": "1.0.0",
        "endpoints": {
            "users": ["GET /api/users", "GET /api/users/:id", "GET /api/users/search/:name"],
            "projects": ["GET /api/projects", "GET /api/projects/:id"],
            "tasks": ["GET /api/tasks"],
            "company": ["GET /api/company", "GET /api/company/metrics"],
            "tools": ["GET /api/tools/calculate", "GET /api/tools/convert"],
            "system": ["GET /api/system/status", "GET /health"]
        }
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": "1.0.0"
    }))
}

async fn list_users(
    State(state): State<MockApiState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    match non_empty(query.get("name")) {
        Some(name) => ok_list(&matching_users(&state.data, name)),
        None => ok_list(&state.data.users),
    }
}

async fn search_users(State(state): State<MockApiState>, Path(name): Path<String>) -> Response {
    ok_list(&matching_users(&state.data, &name))
}

fn matching_users(data: &MockData, needle: &str) -> Vec<User> {
    let needle = needle.to_lowercase();
    data.users
        .iter()
        .filter(|u| {
            u.name.to_lowercase().contains(&needle) || u.email.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

async fn get_user(State(state): State<MockApiState>, Path(id): Path<String>) -> Response {
    let user = id
        .trim()
        .parse::<u32>()
        .ok()
        .and_then(|id| state.data.users.iter().find(|u| u.id == id));

    match user {
        Some(user) => ok(user),
        None => fail(StatusCode::NOT_FOUND, "用户未找到"),
    }
}

async fn list_projects(
    State(state): State<MockApiState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let projects: Vec<&Project> = state
        .data
        .projects
        .iter()
        .filter(|p| non_empty(query.get("status")).map_or(true, |s| p.status == s))
        .collect();

    let count_status = |status: &str| {
        state
            .data
            .projects
            .iter()
            .filter(|p| p.status == status)
            .count()
    };

    Json(json!({
        "success": true,
        "data": projects,
        "count": projects.len(),
        "stats": {
            "inProgress": count_status("进行中"),
            "completed": count_status("已完成"),
            "planned": count_status("计划中")
        }
    }))
    .into_response()
}

async fn get_project(State(state): State<MockApiState>, Path(id): Path<String>) -> Response {
    let project = id
        .trim()
        .parse::<u32>()
        .ok()
        .and_then(|id| state.data.projects.iter().find(|p| p.id == id));

    let Some(project) = project else {
        return fail(StatusCode::NOT_FOUND, "项目未找到");
    };

    let tasks: Vec<&Task> = state
        .data
        .tasks
        .iter()
        .filter(|t| t.project == project.name)
        .collect();

    let mut data = json!(project);
    data["tasks"] = json!(tasks);
    ok(data)
}

async fn list_tasks(
    State(state): State<MockApiState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let assignee = non_empty(query.get("assignee"));
    let priority = non_empty(query.get("priority"));
    let project = non_empty(query.get("project"));

    let tasks: Vec<&Task> = state
        .data
        .tasks
        .iter()
        .filter(|t| assignee.map_or(true, |a| t.assignee == a))
        .filter(|t| priority.map_or(true, |p| t.priority == p))
        .filter(|t| project.map_or(true, |p| t.project == p))
        .collect();

    let count_priority = |level: &str| tasks.iter().filter(|t| t.priority == level).count();

    Json(json!({
        "success": true,
        "data": tasks,
        "count": tasks.len(),
        "stats": {
            "highPriority": count_priority("高"),
            "mediumPriority": count_priority("中"),
            "lowPriority": count_priority("低")
        }
    }))
    .into_response()
}

async fn company(State(state): State<MockApiState>) -> Response {
    ok(&state.data.company)
}

async fn company_metrics(State(state): State<MockApiState>) -> Response {
    ok(&state.data.metrics)
}

#[derive(Debug, Deserialize)]
struct CalculateQuery {
    expression: Option<String>,
}

async fn calculate(Query(query): Query<CalculateQuery>) -> Response {
    let Some(expression) = query.expression.filter(|e| !e.trim().is_empty()) else {
        return fail(StatusCode::BAD_REQUEST, "缺少表达式参数");
    };

    match calc::evaluate(&expression) {
        Ok(result) => {
            debug!(expression = %expression, result, "Expression evaluated");
            ok(json!({
                "expression": expression,
                "result": number(result),
                "type": "number"
            }))
        }
        Err(e) => fail(StatusCode::BAD_REQUEST, format!("计算失败: {}", e)),
    }
}

#[derive(Debug, Deserialize)]
struct ConvertQuery {
    value: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

async fn convert_units(Query(query): Query<ConvertQuery>) -> Response {
    let (Some(value), Some(from), Some(to)) = (query.value, query.from, query.to) else {
        return fail(StatusCode::BAD_REQUEST, "缺少参数：value, from, to");
    };

    let Ok(value) = value.trim().parse::<f64>() else {
        return fail(StatusCode::BAD_REQUEST, "value必须是数字");
    };

    match convert(value, &from, &to) {
        Some((category, result)) => ok(json!({
            "value": number(value),
            "from": from,
            "to": to,
            "result": number(result),
            "category": category
        })),
        None => fail(
            StatusCode::BAD_REQUEST,
            format!("不支持从 {} 到 {} 的转换", from, to),
        ),
    }
}

async fn system_status(State(state): State<MockApiState>) -> Response {
    ok(json!({
        "server": "运行中",
        "uptime": state.started.elapsed().as_secs_f64(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "apiCount": 5,
        "endpoints": [
            "/api/users",
            "/api/projects",
            "/api/tasks",
            "/api/company",
            "/api/tools/calculate",
            "/api/tools/convert",
            "/api/system/status"
        ]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_integral() {
        assert_eq!(number(14.0), json!(14));
        assert_eq!(number(2.5), json!(2.5));
    }

    #[test]
    fn test_matching_users() {
        let data = MockData::default();
        let found = matching_users(&data, "张三");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);

        assert_eq!(matching_users(&data, "COMPANY.COM").len(), 4);
        assert!(matching_users(&data, "nobody").is_empty());
    }
}

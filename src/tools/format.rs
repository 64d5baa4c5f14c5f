//! Human-readable rendering of tool results.

use serde_json::Value;

use super::{format_number, ToolOutput};

/// Render a successful tool result with the template for its tool.
pub fn format_tool_result(output: &ToolOutput) -> String {
    let data = &output.data;

    match output.tool.as_str() {
        "calculate" => format!(
            "计算结果：{} = {}",
            field(data, "expression"),
            field(data, "result")
        ),
        "convert" => format!(
            "转换结果：{} {} = {:.2} {}",
            field(data, "value"),
            field(data, "from"),
            data.get("result").and_then(Value::as_f64).unwrap_or(f64::NAN),
            field(data, "to")
        ),
        "get_users" => list_or_json(data, "用户", "用户信息", |u| {
            format!(
                "{} ({}, {})",
                field(u, "name"),
                field(u, "role"),
                field(u, "department")
            )
        }),
        "get_user_by_id" => format!(
            "用户信息：{} ({}, {})\n邮箱：{}",
            field(data, "name"),
            field(data, "role"),
            field(data, "department"),
            field(data, "email")
        ),
        "get_projects" => list_or_json(data, "项目", "项目信息", |p| {
            format!(
                "{} (状态: {}, 进度: {}%)",
                field(p, "name"),
                field(p, "status"),
                field(p, "progress")
            )
        }),
        "get_tasks" => list_or_json(data, "任务", "任务信息", |t| {
            format!(
                "{} (分配: {}, 优先级: {})",
                field(t, "title"),
                field(t, "assignee"),
                field(t, "priority")
            )
        }),
        "get_company_info" => {
            let departments = data
                .get("departments")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(plain).collect::<Vec<_>>().join(", "))
                .unwrap_or_default();
            format!(
                "公司信息：{}\n成立时间：{}\n员工数：{}\n部门：{}",
                field(data, "name"),
                field(data, "founded"),
                field(data, "employees"),
                departments
            )
        }
        "get_company_metrics" => format!(
            "公司指标：\n月收入：{}元\n活跃项目：{}个\n员工满意度：{}/5",
            data.get("monthlyRevenue")
                .and_then(Value::as_f64)
                .map(group_thousands)
                .unwrap_or_else(|| "-".to_string()),
            field(data, "activeProjects"),
            field(data, "employeeSatisfaction")
        ),
        "get_system_status" => {
            let mut text = format!(
                "系统状态：{}\n运行时间：{}秒",
                field(data, "server"),
                data.get("uptime")
                    .and_then(Value::as_f64)
                    .map(|s| format_number(s.floor()))
                    .unwrap_or_else(|| "-".to_string())
            );
            if let Some(heap) = data
                .get("memory")
                .and_then(|m| m.get("heapUsed"))
                .and_then(Value::as_f64)
            {
                text.push_str(&format!(
                    "\n内存使用：{}MB",
                    format_number((heap / 1024.0 / 1024.0).round())
                ));
            }
            text
        }
        _ => format!("工具调用结果：{}", pretty(data)),
    }
}

fn list_or_json(
    data: &Value,
    noun: &str,
    single_label: &str,
    line: impl Fn(&Value) -> String,
) -> String {
    match data.as_array() {
        Some(items) => {
            let mut text = format!("找到 {} 个{}：", items.len(), noun);
            for item in items {
                text.push_str("\n  • ");
                text.push_str(&line(item));
            }
            text
        }
        None => format!("{}：{}", single_label, pretty(data)),
    }
}

fn field(value: &Value, key: &str) -> String {
    value.get(key).map(plain).unwrap_or_else(|| "-".to_string())
}

/// Strings without quotes, integral numbers without `.0`.
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// `2500000` → `2,500,000`.
fn group_thousands(n: f64) -> String {
    let rendered = format_number(n);
    let (sign, rest) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered.as_str()),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rest, None),
    };

    let mut grouped = String::new();
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

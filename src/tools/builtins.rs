//! The nine built-in tools, in registration order.

use super::{ParamSpec, ParamType, ToolCategory, ToolDescriptor};

/// Built-in tool descriptors.
pub fn builtin_tools() -> Vec<ToolDescriptor> {
    vec![
        calculate(),
        convert(),
        get_users(),
        get_user_by_id(),
        get_projects(),
        get_tasks(),
        ToolDescriptor::new(
            "get_company_info",
            ToolCategory::DataQuery,
            "获取公司基本信息",
            "/api/company",
        ),
        ToolDescriptor::new(
            "get_company_metrics",
            ToolCategory::DataQuery,
            "获取公司运营指标",
            "/api/company/metrics",
        ),
        ToolDescriptor::new(
            "get_system_status",
            ToolCategory::System,
            "获取系统状态信息",
            "/api/system/status",
        ),
    ]
}

fn calculate() -> ToolDescriptor {
    ToolDescriptor::new(
        "calculate",
        ToolCategory::Calculation,
        "执行数学表达式计算，支持加减乘除、指数、函数等",
        "/api/tools/calculate",
    )
    .with_param(ParamSpec::required(
        "expression",
        ParamType::String,
        "要计算的数学表达式，例如：'2+3*4', 'sqrt(16)', 'sin(30)'",
    ))
}

fn convert() -> ToolDescriptor {
    ToolDescriptor::new(
        "convert",
        ToolCategory::Conversion,
        "单位转换工具，支持温度、长度、货币等单位的转换",
        "/api/tools/convert",
    )
    .with_param(ParamSpec::required("value", ParamType::Number, "要转换的数值"))
    .with_param(ParamSpec::required(
        "from",
        ParamType::String,
        "原始单位，例如：'celsius', 'meters', 'usd'",
    ))
    .with_param(ParamSpec::required(
        "to",
        ParamType::String,
        "目标单位，例如：'fahrenheit', 'feet', 'cny'",
    ))
}

fn get_users() -> ToolDescriptor {
    ToolDescriptor::new(
        "get_users",
        ToolCategory::DataQuery,
        "获取用户列表，可以按名称搜索用户",
        "/api/users",
    )
    .with_param(ParamSpec::optional(
        "name",
        ParamType::String,
        "可选的用户姓名搜索关键词",
    ))
}

fn get_user_by_id() -> ToolDescriptor {
    ToolDescriptor::new(
        "get_user_by_id",
        ToolCategory::DataQuery,
        "根据ID获取特定用户信息",
        "/api/users/{id}",
    )
    .with_param(ParamSpec::required("id", ParamType::Number, "用户ID"))
}

fn get_projects() -> ToolDescriptor {
    ToolDescriptor::new(
        "get_projects",
        ToolCategory::DataQuery,
        "获取项目列表，可以按状态过滤",
        "/api/projects",
    )
    .with_param(ParamSpec::optional(
        "status",
        ParamType::String,
        "项目状态：'进行中', '已完成', '计划中'",
    ))
}

fn get_tasks() -> ToolDescriptor {
    ToolDescriptor::new(
        "get_tasks",
        ToolCategory::DataQuery,
        "获取任务列表，可以按分配人、优先级、项目过滤",
        "/api/tasks",
    )
    .with_param(ParamSpec::optional("assignee", ParamType::String, "任务分配人姓名"))
    .with_param(ParamSpec::optional(
        "priority",
        ParamType::String,
        "任务优先级：'高', '中', '低'",
    ))
    .with_param(ParamSpec::optional("project", ParamType::String, "项目名称"))
}

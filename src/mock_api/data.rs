use serde::Serialize;

/// An employee record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// User id.
    pub id: u32,
    /// Full name.
    pub name: &'static str,
    /// Job title.
    pub role: &'static str,
    /// Department.
    pub department: &'static str,
    /// Work email.
    pub email: &'static str,
}

/// A project record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    /// Project id.
    pub id: u32,
    /// Project name.
    pub name: &'static str,
    /// Status, e.g. 进行中.
    pub status: &'static str,
    /// Project lead.
    pub leader: &'static str,
    /// Due date.
    pub deadline: &'static str,
    /// Completion percentage.
    pub progress: u32,
}

/// A task record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task id.
    pub id: u32,
    /// Task title.
    pub title: &'static str,
    /// Assigned user.
    pub assignee: &'static str,
    /// Owning project.
    pub project: &'static str,
    /// Priority: 高, 中 or 低.
    pub priority: &'static str,
    /// Due date.
    pub due_date: &'static str,
}

/// Company profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyInfo {
    /// Company name.
    pub name: &'static str,
    /// Founding year.
    pub founded: &'static str,
    /// Head count.
    pub employees: u32,
    /// Department names.
    pub departments: &'static [&'static str],
    /// Headquarters.
    pub location: &'static str,
    /// Website.
    pub website: &'static str,
}

/// Company operating metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Monthly revenue in yuan.
    pub monthly_revenue: u64,
    /// Projects in progress.
    pub active_projects: u32,
    /// Projects delivered.
    pub completed_projects: u32,
    /// Employee satisfaction out of 5.
    pub employee_satisfaction: f64,
    /// Customer satisfaction out of 5.
    pub customer_satisfaction: f64,
}

/// Fixed data served by the mock backend.
#[derive(Debug, Clone)]
pub struct MockData {
    /// All users.
    pub users: Vec<User>,
    /// All projects.
    pub projects: Vec<Project>,
    /// All tasks.
    pub tasks: Vec<Task>,
    /// Company profile.
    pub company: CompanyInfo,
    /// Company metrics.
    pub metrics: Metrics,
}

impl Default for MockData {
    fn default() -> Self {
        Self {
            users: vec![
                user(1, "张三", "开发工程师", "技术部", "zhangsan@company.com"),
                user(2, "李四", "测试工程师", "质量部", "lisi@company.com"),
                user(3, "王五", "产品经理", "产品部", "wangwu@company.com"),
                user(4, "赵六", "UI设计师", "设计部", "zhaoliu@company.com"),
            ],
            projects: vec![
                project(1, "电商平台升级", "进行中", "张三", "2024-12-31", 65),
                project(2, "移动端App开发", "已完成", "李四", "2024-11-30", 100),
                project(3, "数据中台建设", "进行中", "王五", "2025-03-31", 30),
                project(4, "内部管理系统", "计划中", "赵六", "2025-06-30", 10),
            ],
            tasks: vec![
                task(1, "用户登录模块开发", "张三", "电商平台升级", "高", "2024-12-15"),
                task(2, "支付接口测试", "李四", "电商平台升级", "中", "2024-12-20"),
                task(3, "需求文档编写", "王五", "数据中台建设", "中", "2025-01-15"),
                task(4, "UI设计稿审核", "赵六", "内部管理系统", "低", "2025-02-28"),
            ],
            company: CompanyInfo {
                name: "创新科技公司",
                founded: "2018年",
                employees: 150,
                departments: &["技术部", "产品部", "设计部", "市场部", "行政部"],
                location: "北京市海淀区",
                website: "www.innotech.com",
            },
            metrics: Metrics {
                monthly_revenue: 2_500_000,
                active_projects: 8,
                completed_projects: 15,
                employee_satisfaction: 4.2,
                customer_satisfaction: 4.5,
            },
        }
    }
}

fn user(
    id: u32,
    name: &'static str,
    role: &'static str,
    department: &'static str,
    email: &'static str,
) -> User {
    User {
        id,
        name,
        role,
        department,
        email,
    }
}

fn project(
    id: u32,
    name: &'static str,
    status: &'static str,
    leader: &'static str,
    deadline: &'static str,
    progress: u32,
) -> Project {
    Project {
        id,
        name,
        status,
        leader,
        deadline,
        progress,
    }
}

fn task(
    id: u32,
    title: &'static str,
    assignee: &'static str,
    project: &'static str,
    priority: &'static str,
    due_date: &'static str,
) -> Task {
    Task {
        id,
        title,
        assignee,
        project,
        priority,
        due_date,
    }
}

/// Supported conversions: `(category, from, to, convert)`.
pub const CONVERSIONS: &[(&str, &str, &str, fn(f64) -> f64)] = &[
    ("temperature", "celsius", "fahrenheit", |c| c * 9.0 / 5.0 + 32.0),
    ("temperature", "fahrenheit", "celsius", |f| (f - 32.0) * 5.0 / 9.0),
    ("length", "meters", "feet", |m| m * 3.28084),
    ("length", "feet", "meters", |ft| ft / 3.28084),
    ("length", "kilometers", "miles", |km| km * 0.621371),
    ("length", "miles", "kilometers", |mi| mi / 0.621371),
    ("currency", "usd", "cny", |usd| usd * 7.2),
    ("currency", "cny", "usd", |cny| cny / 7.2),
];

/// Look up a conversion; returns the category and the converted value.
pub fn convert(value: f64, from: &str, to: &str) -> Option<(&'static str, f64)> {
    let from = from.to_lowercase();
    let to = to.to_lowercase();
    CONVERSIONS
        .iter()
        .find(|(_, f, t, _)| *f == from && *t == to)
        .map(|(category, _, _, convert)| (*category, convert(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_temperature() {
        assert_eq!(convert(20.0, "celsius", "fahrenheit"), Some(("temperature", 68.0)));
        let (_, c) = convert(212.0, "Fahrenheit", "Celsius").unwrap();
        assert!((c - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_convert_currency_and_length() {
        assert_eq!(convert(100.0, "usd", "cny"), Some(("currency", 720.0)));
        let (category, feet) = convert(10.0, "meters", "feet").unwrap();
        assert_eq!(category, "length");
        assert!((feet - 32.8084).abs() < 1e-9);
    }

    #[test]
    fn test_convert_unsupported() {
        assert_eq!(convert(1.0, "celsius", "miles"), None);
    }

    #[test]
    fn test_default_data_shape() {
        let data = MockData::default();
        assert_eq!(data.users.len(), 4);
        assert_eq!(data.projects.iter().filter(|p| p.status == "进行中").count(), 2);
        let task = serde_json::to_value(&data.tasks[0]).unwrap();
        assert_eq!(task["dueDate"], "2024-12-15");
    }
}

//! 内置场景
//!
//! 场景定义以 JSON 文件形式随 crate 一起发布，编译期嵌入二进制。

/// (文件名, JSON 内容)
pub const BUILTIN_SCENARIOS: [(&str, &str); 4] = [
    (
        "peak_hours.json",
        include_str!("../../scenarios/peak_hours.json"),
    ),
    (
        "maintenance.json",
        include_str!("../../scenarios/maintenance.json"),
    ),
    (
        "network_issues.json",
        include_str!("../../scenarios/network_issues.json"),
    ),
    (
        "database_load.json",
        include_str!("../../scenarios/database_load.json"),
    ),
];

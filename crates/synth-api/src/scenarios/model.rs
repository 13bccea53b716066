//! 场景数据模型
//!
//! `ScenarioFile` 是场景 JSON 文件的原始形态，所有可选字段都保持 `Option`，
//! 以便校验时给出字段级错误信息；`Scenario` 是校验并补全默认值之后的不可变结果，
//! 延迟引擎和记录生成器只消费后者。

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 未声明 batch_size 时的流式刷新批次
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// 单次请求允许的最大记录数
pub const DEFAULT_MAX_COUNT: u64 = 1_000_000;
/// 未指定数量时的默认记录数
pub const DEFAULT_COUNT: u64 = 10_000;

// ---------------------------------------------------------------------------
// 延迟策略与命名行为
// ---------------------------------------------------------------------------

/// 通用延迟策略
///
/// 未识别或为空的策略名一律回退为 `Fixed`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayStrategy {
    None,
    #[default]
    Fixed,
    Random,
    Progressive,
    Burst,
}

impl DelayStrategy {
    /// 宽松解析策略名，未知值回退为 `Fixed`
    pub fn parse_lenient(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Self::None,
            "random" => Self::Random,
            "progressive" => Self::Progressive,
            "burst" => Self::Burst,
            _ => Self::Fixed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Fixed => "fixed",
            Self::Random => "random",
            Self::Progressive => "progressive",
            Self::Burst => "burst",
        }
    }
}

impl fmt::Display for DelayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 命名场景行为
///
/// 场景类型命中其中之一时，覆盖通用延迟策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioBehavior {
    PeakHours,
    Maintenance,
    NetworkIssues,
    DatabaseLoad,
}

impl ScenarioBehavior {
    pub const ALL: [ScenarioBehavior; 4] = [
        Self::PeakHours,
        Self::Maintenance,
        Self::NetworkIssues,
        Self::DatabaseLoad,
    ];

    /// 根据场景类型查找命名行为
    pub fn from_type(scenario_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|behavior| behavior.as_str() == scenario_type)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PeakHours => "peak_hours",
            Self::Maintenance => "maintenance",
            Self::NetworkIssues => "network_issues",
            Self::DatabaseLoad => "database_load",
        }
    }
}

/// 场景类型是否属于可识别词汇表
///
/// 四个命名行为之外，允许 `custom` 或 `custom_` 前缀的自由标签。
pub fn is_recognized_type(scenario_type: &str) -> bool {
    ScenarioBehavior::from_type(scenario_type).is_some()
        || scenario_type == "custom"
        || scenario_type
            .strip_prefix("custom_")
            .is_some_and(|tag| !tag.is_empty())
}

// ---------------------------------------------------------------------------
// 原始文件结构
// ---------------------------------------------------------------------------

/// 场景文件（未校验）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioFile {
    pub scenario_name: Option<String>,
    pub scenario_type: Option<String>,
    /// 字符串时长或整数毫秒
    pub base_delay: Option<serde_json::Value>,
    pub description: Option<String>,
    pub delay_strategy: Option<String>,
    pub servicenow_mode: Option<bool>,
    pub batch_size: Option<i64>,
    pub response_limits: Option<ResponseLimitsFile>,
    pub servicenow_config: Option<ServiceNowConfigFile>,
    pub error_injection: Option<ErrorInjectionFile>,
    pub performance_monitoring: Option<PerformanceMonitoringFile>,
    pub metadata: Option<ScenarioMetadata>,
}

impl ScenarioFile {
    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseLimitsFile {
    pub max_count: Option<i64>,
    pub default_count: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceNowConfigFile {
    pub record_types: Option<Vec<String>>,
    pub number_prefix: Option<String>,
    pub state_cycle: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorInjectionFile {
    #[serde(default)]
    pub enabled: bool,
    pub error_rate: Option<f64>,
    pub error_codes: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PerformanceMonitoringFile {
    #[serde(default)]
    pub enabled: bool,
    pub metrics_interval: Option<serde_json::Value>,
}

/// 场景元数据
///
/// 除 `min_version` 外均为说明性信息。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMetadata {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// 兼容性约束：semver 要求或裸版本号（视为 `>=`）
    #[serde(default)]
    pub min_version: Option<String>,
}

// ---------------------------------------------------------------------------
// 校验后的场景
// ---------------------------------------------------------------------------

/// 场景来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioSource {
    Builtin,
    User(PathBuf),
}

impl ScenarioSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::User(_) => "user",
        }
    }
}

/// 响应数量限制
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResponseLimits {
    pub max_count: u64,
    pub default_count: u64,
}

impl Default for ResponseLimits {
    fn default() -> Self {
        Self {
            max_count: DEFAULT_MAX_COUNT,
            default_count: DEFAULT_COUNT,
        }
    }
}

/// ServiceNow 风格记录配置
///
/// `record_types` 为空表示未配置，记录不带 `sys_class_name`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceNowConfig {
    pub record_types: Vec<String>,
    pub number_prefix: String,
    pub state_cycle: [String; 4],
}

impl Default for ServiceNowConfig {
    fn default() -> Self {
        Self {
            record_types: Vec::new(),
            number_prefix: "INC".to_string(),
            state_cycle: [
                "New".to_string(),
                "In Progress".to_string(),
                "On Hold".to_string(),
                "Resolved".to_string(),
            ],
        }
    }
}

/// 故障注入配置（仅在启用时存在）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorInjection {
    pub error_rate: f64,
    pub error_codes: Vec<u16>,
}

/// 性能监控配置（仅在启用时存在）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerformanceMonitoring {
    pub metrics_interval: Duration,
}

/// 校验完成的场景
///
/// 所有可选字段都已补全默认值，加载后不可变。
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub scenario_type: String,
    pub description: String,
    pub base_delay: Duration,
    pub delay_strategy: DelayStrategy,
    pub behavior: Option<ScenarioBehavior>,
    pub record_mode: bool,
    pub batch_size: usize,
    pub limits: ResponseLimits,
    pub servicenow: ServiceNowConfig,
    pub error_injection: Option<ErrorInjection>,
    pub performance_monitoring: Option<PerformanceMonitoring>,
    pub metadata: ScenarioMetadata,
    pub source: ScenarioSource,
}

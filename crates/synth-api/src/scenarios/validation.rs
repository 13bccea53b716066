//! 场景校验
//!
//! 将 [`ScenarioFile`] 校验并补全为 [`Scenario`]。校验失败即拒绝（不做截断修正），
//! 错误信息定位到具体字段，CLI 校验命令会原样输出。

use std::path::{Path, PathBuf};
use std::time::Duration;

use semver::{Version, VersionReq};
use thiserror::Error;

use super::duration::{DurationError, parse_duration_value};
use super::model::{
    DEFAULT_BATCH_SIZE, DEFAULT_COUNT, DEFAULT_MAX_COUNT, DelayStrategy, ErrorInjection,
    PerformanceMonitoring, ResponseLimits, Scenario, ScenarioBehavior, ScenarioFile,
    ScenarioSource, ServiceNowConfig, is_recognized_type,
};

pub const MAX_BATCH_SIZE: i64 = 10_000;
pub const MAX_BASE_DELAY: Duration = Duration::from_secs(3600);
pub const MIN_METRICS_INTERVAL: Duration = Duration::from_secs(1);
pub const MAX_METRICS_INTERVAL: Duration = Duration::from_secs(3600);
const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(10);

/// 场景加载/校验错误
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("读取场景文件失败 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("场景文件不是有效的 JSON {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("缺少必填字段 `{field}`")]
    MissingField { field: &'static str },

    #[error("字段 `{field}` 格式错误: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("字段 `{field}` 超出范围: {message}")]
    OutOfRange { field: String, message: String },

    #[error(
        "未知的场景类型 `{0}`，可用类型: peak_hours, maintenance, network_issues, database_load, custom, custom_<tag>"
    )]
    UnknownType(String),

    #[error("场景要求版本 `{required}`，当前版本为 {current}")]
    Incompatible { required: String, current: String },
}

impl ScenarioError {
    fn format(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            field: field.into(),
            message: message.into(),
        }
    }

    fn range(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OutOfRange {
            field: field.into(),
            message: message.into(),
        }
    }

    fn duration(field: &str, err: DurationError) -> Self {
        Self::format(field, err.to_string())
    }
}

/// 当前 crate 版本，用于兼容性检查
pub fn current_version() -> Version {
    Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or_else(|_| Version::new(0, 1, 0))
}

/// 检查 `min_version` 约束
///
/// 不带运算符的版本号（含 `0.1`、`1` 这类省略写法）视为 `>=version`，
/// 其他写法按 semver 要求解析。
pub fn check_compatibility(min_version: Option<&str>, current: &Version) -> Result<(), ScenarioError> {
    let Some(required) = min_version.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(());
    };

    let req = if is_bare_version(required) {
        VersionReq::parse(&format!(">={}", required))
    } else {
        VersionReq::parse(required)
    }
    .map_err(|e| ScenarioError::format("metadata.min_version", e.to_string()))?;
    let compatible = req.matches(current);

    if compatible {
        Ok(())
    } else {
        Err(ScenarioError::Incompatible {
            required: required.to_string(),
            current: current.to_string(),
        })
    }
}

fn is_bare_version(required: &str) -> bool {
    required.starts_with(|c: char| c.is_ascii_digit())
        && !required.contains([',', ' ', '*', 'x', 'X'])
}

/// 从文件读取、解析并校验场景（包含兼容性检查）
pub fn load_scenario_file(path: &Path) -> Result<Scenario, ScenarioError> {
    let content = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file = ScenarioFile::from_json(&content).map_err(|source| ScenarioError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let scenario = validate(file, ScenarioSource::User(path.to_path_buf()))?;
    check_compatibility(scenario.metadata.min_version.as_deref(), &current_version())?;
    Ok(scenario)
}

/// 校验场景文件并补全默认值
pub fn validate(mut file: ScenarioFile, source: ScenarioSource) -> Result<Scenario, ScenarioError> {
    let name = required_text(file.scenario_name.take(), "scenario_name")?;
    let scenario_type = required_text(file.scenario_type.take(), "scenario_type")?;
    if !is_recognized_type(&scenario_type) {
        return Err(ScenarioError::UnknownType(scenario_type));
    }

    let base_delay = file
        .base_delay
        .as_ref()
        .ok_or(ScenarioError::MissingField { field: "base_delay" })
        .and_then(|value| {
            parse_duration_value(value).map_err(|e| ScenarioError::duration("base_delay", e))
        })?;
    if base_delay > MAX_BASE_DELAY {
        return Err(ScenarioError::range("base_delay", "不能超过 1h"));
    }

    let batch_size = match file.batch_size {
        None => DEFAULT_BATCH_SIZE,
        Some(size) if (1..=MAX_BATCH_SIZE).contains(&size) => size as usize,
        Some(size) => {
            return Err(ScenarioError::range(
                "batch_size",
                format!("{} 不在 1..={} 之间", size, MAX_BATCH_SIZE),
            ));
        }
    };

    let limits = validate_limits(&file)?;
    let servicenow = validate_servicenow(&file)?;
    let error_injection = validate_error_injection(&file)?;
    let performance_monitoring = validate_monitoring(&file)?;

    Ok(Scenario {
        behavior: ScenarioBehavior::from_type(&scenario_type),
        name,
        scenario_type,
        description: file.description.unwrap_or_default(),
        base_delay,
        delay_strategy: file
            .delay_strategy
            .as_deref()
            .map(DelayStrategy::parse_lenient)
            .unwrap_or_default(),
        record_mode: file.servicenow_mode.unwrap_or(false),
        batch_size,
        limits,
        servicenow,
        error_injection,
        performance_monitoring,
        metadata: file.metadata.unwrap_or_default(),
        source,
    })
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String, ScenarioError> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(ScenarioError::MissingField { field })
}

fn validate_limits(file: &ScenarioFile) -> Result<ResponseLimits, ScenarioError> {
    let Some(limits) = &file.response_limits else {
        return Ok(ResponseLimits::default());
    };

    let max_count = match limits.max_count {
        None => DEFAULT_MAX_COUNT,
        Some(max) if max >= 1 && max as u64 <= DEFAULT_MAX_COUNT => max as u64,
        Some(max) => {
            return Err(ScenarioError::range(
                "response_limits.max_count",
                format!("{} 不在 1..={} 之间", max, DEFAULT_MAX_COUNT),
            ));
        }
    };

    let default_count = match limits.default_count {
        // 未声明时使用全局默认值，但不超过本场景的上限
        None => DEFAULT_COUNT.min(max_count),
        Some(count) if count >= 1 && count as u64 <= max_count => count as u64,
        Some(count) => {
            return Err(ScenarioError::range(
                "response_limits.default_count",
                format!("{} 不在 1..={} 之间", count, max_count),
            ));
        }
    };

    Ok(ResponseLimits {
        max_count,
        default_count,
    })
}

fn validate_servicenow(file: &ScenarioFile) -> Result<ServiceNowConfig, ScenarioError> {
    let mut config = ServiceNowConfig::default();
    let Some(section) = &file.servicenow_config else {
        return Ok(config);
    };

    if let Some(types) = &section.record_types {
        if types.is_empty() || types.iter().any(|t| t.trim().is_empty()) {
            return Err(ScenarioError::format(
                "servicenow_config.record_types",
                "必须是非空字符串列表",
            ));
        }
        config.record_types = types.clone();
    }

    if let Some(prefix) = &section.number_prefix {
        let valid = (1..=8).contains(&prefix.len())
            && prefix.bytes().all(|b| b.is_ascii_uppercase());
        if !valid {
            return Err(ScenarioError::format(
                "servicenow_config.number_prefix",
                format!("`{}` 必须是 1-8 个大写字母", prefix),
            ));
        }
        config.number_prefix = prefix.clone();
    }

    if let Some(states) = &section.state_cycle {
        let cycle: [String; 4] = states.clone().try_into().map_err(|v: Vec<String>| {
            ScenarioError::format(
                "servicenow_config.state_cycle",
                format!("必须恰好包含 4 个状态，实际为 {}", v.len()),
            )
        })?;
        if cycle.iter().any(|s| s.trim().is_empty()) {
            return Err(ScenarioError::format(
                "servicenow_config.state_cycle",
                "状态名不能为空",
            ));
        }
        config.state_cycle = cycle;
    }

    Ok(config)
}

fn validate_error_injection(file: &ScenarioFile) -> Result<Option<ErrorInjection>, ScenarioError> {
    let Some(section) = &file.error_injection else {
        return Ok(None);
    };

    let error_rate = section.error_rate.unwrap_or(0.0);
    if !(0.0..=1.0).contains(&error_rate) {
        return Err(ScenarioError::range(
            "error_injection.error_rate",
            format!("{} 不在 0.0..=1.0 之间", error_rate),
        ));
    }

    let codes = section.error_codes.clone().unwrap_or_else(|| vec![500]);
    if section.enabled && codes.is_empty() {
        return Err(ScenarioError::format(
            "error_injection.error_codes",
            "启用故障注入时不能为空",
        ));
    }
    let error_codes = codes
        .into_iter()
        .map(|code| {
            if (400..=599).contains(&code) {
                Ok(code as u16)
            } else {
                Err(ScenarioError::range(
                    "error_injection.error_codes",
                    format!("{} 不是 4xx/5xx 状态码", code),
                ))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    // 字段在禁用时同样要求合法，但不生效
    Ok(section.enabled.then_some(ErrorInjection {
        error_rate,
        error_codes,
    }))
}

fn validate_monitoring(
    file: &ScenarioFile,
) -> Result<Option<PerformanceMonitoring>, ScenarioError> {
    let Some(section) = &file.performance_monitoring else {
        return Ok(None);
    };

    let metrics_interval = match &section.metrics_interval {
        None => DEFAULT_METRICS_INTERVAL,
        Some(value) => parse_duration_value(value)
            .map_err(|e| ScenarioError::duration("performance_monitoring.metrics_interval", e))?,
    };
    if !(MIN_METRICS_INTERVAL..=MAX_METRICS_INTERVAL).contains(&metrics_interval) {
        return Err(ScenarioError::range(
            "performance_monitoring.metrics_interval",
            "必须在 1s..=1h 之间",
        ));
    }

    Ok(section.enabled.then_some(PerformanceMonitoring { metrics_interval }))
}

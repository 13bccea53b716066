//! 查询参数解析
//!
//! 查询参数统一以字符串接收，避免 axum 在类型不符时直接拒绝请求；
//! 由这里决定哪些参数宽松回退、哪些返回 400。

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use synth_shared::observability::metrics;

use crate::error::{ApiError, ApiResult};
use crate::scenarios::{MAX_BATCH_SIZE, Scenario, ScenarioConfig, parse_query_delay};
use crate::state::AppState;

/// 去掉空白后为空的参数视为未提供
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// 宽松解析整数，无法解析时视为未提供
pub fn lenient_i64(value: &Option<String>) -> Option<i64> {
    non_empty(value).and_then(|s| s.parse().ok())
}

/// 解析 `true/false/1/0`，未提供时返回 None
pub fn parse_bool(name: &'static str, value: &Option<String>) -> ApiResult<Option<bool>> {
    match non_empty(value).map(str::to_ascii_lowercase).as_deref() {
        None => Ok(None),
        Some("true" | "1") => Ok(Some(true)),
        Some("false" | "0") => Ok(Some(false)),
        Some(other) => Err(ApiError::invalid(
            name,
            format!("`{}` 不是布尔值，可用值: true, false, 1, 0", other),
        )),
    }
}

/// 解析延迟参数；负整数视为不等待
pub fn parse_delay(value: &Option<String>) -> ApiResult<Option<Duration>> {
    non_empty(value)
        .map(|s| parse_query_delay(s).map_err(|e| ApiError::invalid("delay", e.to_string())))
        .transpose()
}

/// 解析记录总数，必须落在 `[1, max_count]`
pub fn parse_count(
    name: &'static str,
    value: &Option<String>,
    config: &ScenarioConfig,
) -> ApiResult<u64> {
    let Some(raw) = non_empty(value) else {
        return Ok(config.default_count);
    };

    let count: i64 = raw
        .parse()
        .map_err(|_| ApiError::invalid(name, format!("`{}` 不是整数", raw)))?;
    if count < 1 || count as u64 > config.max_count {
        return Err(ApiError::invalid(
            name,
            format!("{} 不在 1..={} 之间", count, config.max_count),
        ));
    }
    Ok(count as u64)
}

/// 批次大小越界时回退到场景/默认值
pub fn batch_size_or(value: &Option<String>, fallback: usize) -> usize {
    match lenient_i64(value) {
        Some(size) if (1..=MAX_BATCH_SIZE).contains(&size) => size as usize,
        _ => fallback,
    }
}

/// 按名称解析场景；未提供时返回 None，未知名称返回 400
pub fn resolve_scenario(state: &AppState, name: &Option<String>) -> ApiResult<Option<Arc<Scenario>>> {
    let Some(name) = non_empty(name) else {
        return Ok(None);
    };
    state
        .registry
        .resolve(name)
        .map(Some)
        .ok_or_else(|| ApiError::UnknownScenario {
            name: name.to_string(),
            known: state.registry.list(),
        })
}

/// 场景对应的请求参数，未指定场景时使用全局默认值
pub fn scenario_config(state: &AppState, scenario: Option<&Scenario>) -> ScenarioConfig {
    match scenario {
        Some(s) => state.registry.config_for(&s.scenario_type),
        None => state.registry.default_config(),
    }
}

/// 故障注入：每个请求掷一次骰子
pub fn inject_error(scenario: Option<&Scenario>) -> ApiResult<()> {
    let Some(scenario) = scenario else {
        return Ok(());
    };
    let Some(injection) = &scenario.error_injection else {
        return Ok(());
    };
    if injection.error_codes.is_empty() {
        return Ok(());
    }

    let mut rng = rand::rng();
    if !rng.random_bool(injection.error_rate.clamp(0.0, 1.0)) {
        return Ok(());
    }

    let status = injection.error_codes[rng.random_range(0..injection.error_codes.len())];
    warn!(scenario = %scenario.scenario_type, status = status, "注入模拟错误");
    metrics::record_injected_error(&scenario.scenario_type, status);
    Err(ApiError::Injected {
        scenario: scenario.scenario_type.clone(),
        status,
    })
}

//! 场景查询服务
//!
//! 只读暴露注册表内容，便于客户端确认当前生效的场景配置。

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::scenarios::{Scenario, ScenarioMetadata, ServiceNowConfig, as_millis_u64};
use crate::state::AppState;

/// 场景摘要
#[derive(Debug, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub scenario_type: String,
    pub name: String,
    pub description: String,
    pub delay_strategy: String,
    pub base_delay_ms: u64,
    pub batch_size: usize,
    pub servicenow_mode: bool,
    pub max_count: u64,
    pub default_count: u64,
    pub source: String,
    pub error_injection: bool,
    pub performance_monitoring: bool,
}

impl From<&Scenario> for ScenarioSummary {
    fn from(s: &Scenario) -> Self {
        Self {
            scenario_type: s.scenario_type.clone(),
            name: s.name.clone(),
            description: s.description.clone(),
            delay_strategy: s.delay_strategy.to_string(),
            base_delay_ms: as_millis_u64(s.base_delay),
            batch_size: s.batch_size,
            servicenow_mode: s.record_mode,
            max_count: s.limits.max_count,
            default_count: s.limits.default_count,
            source: s.source.label().to_string(),
            error_injection: s.error_injection.is_some(),
            performance_monitoring: s.performance_monitoring.is_some(),
        }
    }
}

/// 场景列表响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ScenarioListResponse {
    pub scenarios: Vec<ScenarioSummary>,
    pub total: usize,
}

/// 场景详情响应
#[derive(Debug, Serialize)]
pub struct ScenarioDetailResponse {
    #[serde(flatten)]
    pub summary: ScenarioSummary,
    pub servicenow_config: ServiceNowConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_codes: Option<Vec<u16>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_interval_ms: Option<u64>,
    pub metadata: ScenarioMetadata,
}

pub fn scenario_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/scenarios", get(list_scenarios))
        .route("/scenarios/{scenario_type}", get(get_scenario))
}

/// GET /scenarios
async fn list_scenarios(State(state): State<Arc<AppState>>) -> Json<ScenarioListResponse> {
    let scenarios: Vec<ScenarioSummary> = state
        .registry
        .scenarios()
        .iter()
        .map(|s| ScenarioSummary::from(s.as_ref()))
        .collect();
    let total = scenarios.len();
    Json(ScenarioListResponse { scenarios, total })
}

/// GET /scenarios/:scenario_type
async fn get_scenario(
    State(state): State<Arc<AppState>>,
    Path(scenario_type): Path<String>,
) -> ApiResult<Json<ScenarioDetailResponse>> {
    let scenario = state
        .registry
        .resolve(&scenario_type)
        .ok_or(ApiError::ScenarioNotFound(scenario_type))?;

    Ok(Json(ScenarioDetailResponse {
        summary: ScenarioSummary::from(scenario.as_ref()),
        servicenow_config: scenario.servicenow.clone(),
        error_rate: scenario.error_injection.as_ref().map(|e| e.error_rate),
        error_codes: scenario
            .error_injection
            .as_ref()
            .map(|e| e.error_codes.clone()),
        metrics_interval_ms: scenario
            .performance_monitoring
            .map(|m| as_millis_u64(m.metrics_interval)),
        metadata: scenario.metadata.clone(),
    }))
}

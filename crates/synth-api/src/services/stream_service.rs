//! 流式数据服务
//!
//! GET /stream：以分块传输逐条输出 JSON 数组，每条记录前按场景延迟等待。

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::info;

use crate::delay::DelayPlan;
use crate::error::ApiResult;
use crate::generators::RecordGenerator;
use crate::scenarios::{DelayStrategy, as_millis_u64};
use crate::state::AppState;
use crate::streaming::{self, StreamPlan};

use super::params;

/// 流式请求参数
#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    pub count: Option<String>,
    pub delay: Option<String>,
    pub strategy: Option<String>,
    pub scenario: Option<String>,
    pub batch_size: Option<String>,
    pub servicenow: Option<String>,
}

pub fn stream_routes() -> Router<Arc<AppState>> {
    Router::new().route("/stream", get(stream_records))
}

/// 根据请求参数与场景生成流式计划
///
/// 所有参数校验在这里完成，校验失败时不会产生任何延迟或生成开销。
pub fn build_plan(state: &AppState, query: &StreamQuery) -> ApiResult<StreamPlan> {
    let scenario = params::resolve_scenario(state, &query.scenario)?;
    let config = params::scenario_config(state, scenario.as_deref());

    let count = params::parse_count("count", &query.count, &config)?;
    let delay_override = params::parse_delay(&query.delay)?;
    let record_mode = params::parse_bool("servicenow", &query.servicenow)?.unwrap_or(config.record_mode);
    let batch_size = params::batch_size_or(&query.batch_size, config.batch_size);

    params::inject_error(scenario.as_deref())?;

    let strategy = params::non_empty(&query.strategy)
        .map(DelayStrategy::parse_lenient)
        .or(scenario.as_ref().map(|s| s.delay_strategy))
        .unwrap_or_default();

    let delay = match scenario.as_deref() {
        Some(s) => DelayPlan::new(
            strategy,
            delay_override.unwrap_or(s.base_delay),
            s.behavior,
        ),
        None => DelayPlan::new(strategy, delay_override.unwrap_or_default(), None),
    };

    let generator = RecordGenerator::new(
        record_mode,
        scenario
            .as_ref()
            .map(|s| s.servicenow.clone())
            .unwrap_or_default(),
    );

    Ok(StreamPlan {
        scenario: scenario
            .as_ref()
            .map(|s| s.scenario_type.clone())
            .unwrap_or_else(|| "none".to_string()),
        count,
        batch_size,
        delay,
        generator,
        monitor_interval: scenario
            .as_ref()
            .and_then(|s| s.performance_monitoring)
            .map(|m| m.metrics_interval),
    })
}

/// 流式输出记录
///
/// GET /stream
async fn stream_records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StreamQuery>,
) -> ApiResult<Response> {
    let plan = build_plan(&state, &query)?;

    info!(
        scenario = %plan.scenario,
        count = plan.count,
        batch_size = plan.batch_size,
        strategy = %plan.delay.strategy,
        base_delay_ms = as_millis_u64(plan.delay.base),
        servicenow = plan.generator.record_mode(),
        "开始流式响应"
    );

    let body = streaming::into_body(plan);
    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}

//! 大数组服务
//!
//! GET /large：一次性返回 `count` 条记录，不涉及场景与延迟。

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;
use tracing::info;

use crate::error::ApiResult;
use crate::generators::{RecordGenerator, SyntheticRecord};
use crate::state::AppState;

use super::params;

#[derive(Debug, Default, Deserialize)]
pub struct LargeQuery {
    pub count: Option<String>,
    pub servicenow: Option<String>,
}

pub fn large_routes() -> Router<Arc<AppState>> {
    Router::new().route("/large", get(get_large))
}

/// GET /large
async fn get_large(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LargeQuery>,
) -> ApiResult<Json<Vec<SyntheticRecord>>> {
    let config = state.registry.default_config();
    let count = params::parse_count("count", &query.count, &config)?;
    let record_mode = params::parse_bool("servicenow", &query.servicenow)?.unwrap_or(false);

    info!(count = count, servicenow = record_mode, "生成大数组响应");

    let generator = RecordGenerator::new(record_mode, Default::default());
    let records = (1..=count).map(|index| generator.generate(index)).collect();
    Ok(Json(records))
}

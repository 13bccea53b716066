//! 路由组装
//!
//! 汇总各服务路由，并按固定顺序叠加中间件：
//! 认证 -> CORS -> HTTP 追踪与指标 -> 请求 ID（最外层）。

use std::sync::Arc;

use axum::{Router, http::HeaderValue, middleware};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use synth_shared::observability::middleware as obs_middleware;

use crate::docs::docs_routes;
use crate::middleware::{AuthState, auth_middleware};
use crate::services::{
    health_routes, large_routes, pagination_routes, scenario_routes, stream_routes,
};
use crate::state::AppState;

/// 根据逗号分隔的来源列表构建 CORS 层
pub fn cors_layer(allowed_origins: &str) -> CorsLayer {
    if allowed_origins.trim() == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 构建完整应用路由
pub fn build_router(state: AppState, auth: Option<AuthState>, cors_origins: &str) -> Router {
    let mut router = Router::new()
        .merge(health_routes())
        .merge(stream_routes())
        .merge(pagination_routes())
        .merge(large_routes())
        .merge(scenario_routes())
        .merge(docs_routes());

    if let Some(auth) = auth {
        info!("已启用认证（Basic / X-API-Key）");
        router = router.layer(middleware::from_fn_with_state(Arc::new(auth), auth_middleware));
    }

    router
        .layer(cors_layer(cors_origins))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(Arc::new(state))
}

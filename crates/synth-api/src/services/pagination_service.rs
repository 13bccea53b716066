//! 分页数据服务
//!
//! GET /paginated：支持 offset/limit、page/size、cursor 三种寻址方式，
//! 每次请求按场景延迟等待一次。

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;
use tracing::{debug, info};

use synth_shared::observability::metrics;

use crate::delay::{self, DelayPlan, cancel_pair};
use crate::error::{ApiError, ApiResult};
use crate::generators::RecordGenerator;
use crate::pagination::{self, Addressing, Page};
use crate::scenarios::{DelayStrategy, as_millis_u64};
use crate::state::AppState;

use super::params;

/// 分页请求参数
#[derive(Debug, Default, Deserialize)]
pub struct PaginatedQuery {
    pub total: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub page: Option<String>,
    pub size: Option<String>,
    pub cursor: Option<String>,
    pub servicenow: Option<String>,
    pub delay: Option<String>,
    pub scenario: Option<String>,
}

impl PaginatedQuery {
    /// 多种寻址参数同时出现时：cursor 优先，其次 page/size，最后 offset/limit
    pub fn addressing(&self) -> Addressing {
        if self.cursor.is_some() {
            return Addressing::Cursor(params::non_empty(&self.cursor).map(str::to_string));
        }
        if self.page.is_some() || self.size.is_some() {
            return Addressing::Page {
                page: params::lenient_i64(&self.page),
                size: params::lenient_i64(&self.size),
            };
        }
        Addressing::Offset {
            offset: params::lenient_i64(&self.offset),
            limit: params::lenient_i64(&self.limit),
        }
    }
}

pub fn pagination_routes() -> Router<Arc<AppState>> {
    Router::new().route("/paginated", get(get_page))
}

/// 分页获取记录
///
/// GET /paginated
async fn get_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaginatedQuery>,
) -> ApiResult<Json<Page>> {
    let scenario = params::resolve_scenario(&state, &query.scenario)?;
    let config = params::scenario_config(&state, scenario.as_deref());

    let total = params::parse_count("total", &query.total, &config)?;
    let delay_override = params::parse_delay(&query.delay)?;
    let record_mode = params::parse_bool("servicenow", &query.servicenow)?.unwrap_or(config.record_mode);

    params::inject_error(scenario.as_deref())?;

    let addressing = query.addressing();
    let (window, metadata) = pagination::resolve(&addressing, total, &state.page_limits());

    let plan = match scenario.as_deref() {
        Some(s) => DelayPlan::new(
            s.delay_strategy,
            delay_override.unwrap_or(s.base_delay),
            s.behavior,
        ),
        None => DelayPlan::new(DelayStrategy::Fixed, delay_override.unwrap_or_default(), None),
    };

    let waited = wait_for_page(plan, window.first_index()).await?;

    let generator = RecordGenerator::new(
        record_mode,
        scenario
            .as_ref()
            .map(|s| s.servicenow.clone())
            .unwrap_or_default(),
    );
    let page = pagination::build_page(&window, metadata, &generator);

    let scenario_label = scenario
        .as_ref()
        .map(|s| s.scenario_type.as_str())
        .unwrap_or("none");
    metrics::record_page_served(addressing.style(), scenario_label);
    info!(
        scenario = %scenario_label,
        style = addressing.style(),
        start = window.start,
        size = window.size,
        returned = page.result.len(),
        total = total,
        has_more = page.metadata.has_more,
        delay_ms = as_millis_u64(waited),
        "分页请求完成"
    );

    Ok(Json(page))
}

/// 每页只等待一次
///
/// 等待在独立任务中进行；handler 被丢弃（客户端断开）时守卫触发取消，任务随即结束。
async fn wait_for_page(plan: DelayPlan, index: u64) -> ApiResult<Duration> {
    let (handle, signal) = cancel_pair();
    let _guard = handle.drop_guard();

    let waiting = tokio::spawn(async move {
        let result = delay::delay(&plan, index, &signal).await;
        if result.is_err() {
            debug!(index = index, "客户端断开，分页等待已取消");
        }
        result
    });

    match waiting.await {
        Ok(Ok(waited)) => Ok(waited),
        Ok(Err(e)) => Err(ApiError::Internal(e.to_string())),
        Err(e) => Err(ApiError::Internal(format!("分页等待任务异常: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn create_test_app() -> Router {
        pagination_routes().with_state(Arc::new(AppState::builtin()))
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let response = create_test_app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn ids(json: &serde_json::Value) -> Vec<u64> {
        json["result"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_u64().unwrap())
            .collect()
    }

    #[test]
    fn test_addressing_precedence() {
        let query = PaginatedQuery {
            cursor: Some(String::new()),
            page: Some("3".into()),
            offset: Some("10".into()),
            ..Default::default()
        };
        assert_eq!(query.addressing(), Addressing::Cursor(None));

        let query = PaginatedQuery {
            size: Some("20".into()),
            offset: Some("10".into()),
            ..Default::default()
        };
        assert_eq!(
            query.addressing(),
            Addressing::Page {
                page: None,
                size: Some(20)
            }
        );

        assert_eq!(PaginatedQuery::default().addressing(), Addressing::default());
    }

    #[tokio::test]
    async fn test_last_partial_page() {
        let (status, json) = get_json("/paginated?total=150&limit=100&offset=100").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&json).len(), 50);
        assert_eq!(json["metadata"]["has_more"], false);
        assert!(json["metadata"].get("next_offset").is_none());
        assert_eq!(json["metadata"]["total_count"], 150);
    }

    #[tokio::test]
    async fn test_offset_beyond_total() {
        let (status, json) = get_json("/paginated?total=100&offset=200").await;
        assert_eq!(status, StatusCode::OK);
        assert!(ids(&json).is_empty());
        assert_eq!(json["metadata"]["has_more"], false);
    }

    #[tokio::test]
    async fn test_page_and_offset_identity() {
        let (_, by_offset) = get_json("/paginated?total=1000&offset=100&limit=100").await;
        let (_, by_page) = get_json("/paginated?total=1000&page=2&size=100").await;
        assert_eq!(ids(&by_offset), ids(&by_page));
        assert_eq!(ids(&by_offset), (101..=200).collect::<Vec<_>>());
        assert_eq!(by_page["metadata"]["next_page"], 3);
    }

    #[tokio::test]
    async fn test_cursor_pages() {
        let (_, first) = get_json("/paginated?total=120&cursor=").await;
        assert_eq!(ids(&first).len(), 100);
        let next = first["metadata"]["next_cursor"].as_str().unwrap().to_string();

        let (_, second) = get_json(&format!("/paginated?total=120&cursor={next}")).await;
        assert_eq!(ids(&second), (101..=120).collect::<Vec<_>>());
        assert!(second["metadata"].get("next_cursor").is_none());
    }

    #[tokio::test]
    async fn test_total_bounds() {
        let (status, json) = get_json("/paginated?total=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "INVALID_PARAMETER");

        let (status, _) = get_json("/paginated?total=1000001").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_servicenow_page() {
        let (_, json) = get_json("/paginated?total=10&limit=2&offset=4&servicenow=true").await;
        let first = &json["result"][0];
        assert_eq!(first["id"], 5);
        assert_eq!(first["number"], "INC0000005");
        assert_eq!(first["state"], "In Progress");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_applied_once_per_page() {
        let started = tokio::time::Instant::now();
        let (status, json) = get_json("/paginated?scenario=peak_hours&total=100&limit=100").await;
        let elapsed = started.elapsed();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&json).len(), 100);
        // peak_hours 每次等待 200ms，整页只等一次
        assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(400), "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_error_injection_on_page() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("flaky.json"),
            r#"{"scenario_name": "Flaky", "scenario_type": "custom_flaky", "base_delay": 0,
                "error_injection": {"enabled": true, "error_rate": 1.0, "error_codes": [502]}}"#,
        )
        .unwrap();
        let limits = synth_shared::config::LimitsConfig::default();
        let (registry, _) = crate::scenarios::ScenarioRegistry::load(Some(dir.path()), &limits);
        let app = pagination_routes().with_state(Arc::new(AppState::new(Arc::new(registry), limits)));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/paginated?scenario=custom_flaky&total=10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "INJECTED_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_scenario_rejected() {
        let (status, json) = get_json("/paginated?scenario=holiday").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "UNKNOWN_SCENARIO");
    }
}

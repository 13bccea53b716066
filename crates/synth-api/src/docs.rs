//! 接口说明
//!
//! 每个端点用一份声明式元数据描述（路径、参数、响应形态），
//! 由 GET /api/endpoints 原样返回。

use std::sync::Arc;

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct ParamDoc {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
    pub example: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointDoc {
    pub method: &'static str,
    pub path: &'static str,
    pub summary: &'static str,
    pub parameters: Vec<ParamDoc>,
    pub response: &'static str,
}

const fn param(
    name: &'static str,
    kind: &'static str,
    description: &'static str,
    range: Option<&'static str>,
    default: Option<&'static str>,
    example: &'static str,
) -> ParamDoc {
    ParamDoc {
        name,
        kind,
        description,
        range,
        default,
        example,
    }
}

fn scenario_param() -> ParamDoc {
    param(
        "scenario",
        "string",
        "场景类型，决定延迟行为、批次大小、记录形态与数量上限",
        None,
        None,
        "peak_hours",
    )
}

fn delay_param() -> ParamDoc {
    param(
        "delay",
        "duration",
        "覆盖场景基础延迟；支持 100ms/2s/1m30s 或整数毫秒，负整数表示不等待",
        None,
        Some("场景基础延迟或 0"),
        "250ms",
    )
}

fn servicenow_param() -> ParamDoc {
    param(
        "servicenow",
        "bool",
        "是否附加 sys_id/number/state 字段",
        Some("true, false, 1, 0"),
        Some("场景配置或 false"),
        "true",
    )
}

/// 全部端点说明
pub fn endpoint_catalog() -> Vec<EndpointDoc> {
    vec![
        EndpointDoc {
            method: "GET",
            path: "/stream",
            summary: "分块传输的 JSON 数组，逐条按场景延迟输出",
            parameters: vec![
                param("count", "integer", "记录总数", Some("1..=max_count"), Some("10000"), "5000"),
                delay_param(),
                param(
                    "strategy",
                    "string",
                    "延迟策略，未知值按 fixed 处理",
                    Some("none, fixed, random, progressive, burst"),
                    Some("fixed"),
                    "burst",
                ),
                scenario_param(),
                param("batch_size", "integer", "刷新批次大小，越界时使用场景默认值", Some("1..=10000"), Some("100"), "50"),
                servicenow_param(),
            ],
            response: "[{\"id\": 1, \"value\": \"value_1\", \"timestamp\": \"...\"}, ...]",
        },
        EndpointDoc {
            method: "GET",
            path: "/paginated",
            summary: "分页获取记录；cursor 优先，其次 page/size，最后 offset/limit",
            parameters: vec![
                param("total", "integer", "记录总数上限", Some("1..=max_count"), Some("10000"), "150"),
                param("limit", "integer", "offset 方式的页大小", Some("1..=1000"), Some("100"), "100"),
                param("offset", "integer", "起始位置（从 0 开始）", Some(">= 0"), Some("0"), "100"),
                param("page", "integer", "页码（从 1 开始）", Some(">= 1"), Some("1"), "2"),
                param("size", "integer", "page 方式的页大小", Some("1..=1000"), Some("100"), "100"),
                param("cursor", "string", "上一页返回的 next_cursor，空值表示从头开始", None, None, "djE6MTAwOjEwMA"),
                servicenow_param(),
                delay_param(),
                scenario_param(),
            ],
            response: "{\"result\": [...], \"metadata\": {\"total_count\", \"has_more\", \"limit\", \"offset\", \"next_offset\" | \"page\", \"size\", \"next_page\" | \"next_cursor\"}}",
        },
        EndpointDoc {
            method: "GET",
            path: "/large",
            summary: "一次性返回完整数组，无场景与延迟",
            parameters: vec![
                param("count", "integer", "记录总数", Some("1..=max_count"), Some("10000"), "10000"),
                servicenow_param(),
            ],
            response: "[{\"id\": 1, ...}, ...]",
        },
        EndpointDoc {
            method: "GET",
            path: "/scenarios",
            summary: "当前生效的场景列表",
            parameters: vec![],
            response: "{\"scenarios\": [...], \"total\": 4}",
        },
        EndpointDoc {
            method: "GET",
            path: "/scenarios/{scenario_type}",
            summary: "单个场景的完整配置",
            parameters: vec![],
            response: "{\"scenario_type\": \"peak_hours\", ...}",
        },
        EndpointDoc {
            method: "GET",
            path: "/health",
            summary: "存活检查（无需认证）",
            parameters: vec![],
            response: "{\"status\": \"healthy\"}",
        },
        EndpointDoc {
            method: "GET",
            path: "/ready",
            summary: "就绪检查（无需认证）",
            parameters: vec![],
            response: "{\"status\": \"ready\", \"scenarios\": 4}",
        },
        EndpointDoc {
            method: "GET",
            path: "/metrics",
            summary: "Prometheus 指标",
            parameters: vec![],
            response: "text/plain",
        },
        EndpointDoc {
            method: "GET",
            path: "/api/endpoints",
            summary: "端点说明（即本列表）",
            parameters: vec![],
            response: "[{\"method\": \"GET\", \"path\": \"/stream\", \"parameters\": [...]}]",
        },
    ]
}

pub fn docs_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/endpoints", get(list_endpoints))
}

/// GET /api/endpoints
async fn list_endpoints() -> Json<Vec<EndpointDoc>> {
    Json(endpoint_catalog())
}

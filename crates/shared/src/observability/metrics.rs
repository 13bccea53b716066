//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标由服务自身的 `/metrics` 路由暴露，供 Prometheus 抓取。

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::{Mutex, OnceLock};

/// 全局 Prometheus handle，recorder 只能安装一次
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static INSTALL_LOCK: Mutex<()> = Mutex::new(());

/// 安装 Prometheus recorder 并返回渲染句柄
///
/// 多次调用返回同一个句柄，不会重复安装 recorder。
pub fn install(service_name: &str) -> Result<PrometheusHandle> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let _guard = INSTALL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let handle = PROMETHEUS_HANDLE.get_or_init(|| handle).clone();

    register_common_metrics(service_name);
    Ok(handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// 注册通用指标描述
///
/// 这些描述会出现在 /metrics 端点的 HELP 注释中
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("synth_http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "synth_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "synth_stream_items_total",
        "Total number of records emitted by streaming responses"
    );
    metrics::describe_counter!(
        "synth_stream_cancelled_total",
        "Streaming responses stopped by client disconnect"
    );
    metrics::describe_counter!("synth_pages_served_total", "Total number of pages served");
    metrics::describe_counter!(
        "synth_injected_errors_total",
        "Requests answered with an injected error status"
    );

    metrics::counter!("synth_service_starts_total", "service" => service_name.to_string())
        .increment(1);
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "synth_http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "synth_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录流式输出的记录数
#[inline]
pub fn record_stream_items(scenario: &str, items: u64) {
    metrics::counter!("synth_stream_items_total", "scenario" => scenario.to_string())
        .increment(items);
}

/// 记录被客户端断开的流
#[inline]
pub fn record_stream_cancelled(scenario: &str) {
    metrics::counter!("synth_stream_cancelled_total", "scenario" => scenario.to_string())
        .increment(1);
}

/// 记录分页请求
#[inline]
pub fn record_page_served(style: &str, scenario: &str) {
    metrics::counter!(
        "synth_pages_served_total",
        "style" => style.to_string(),
        "scenario" => scenario.to_string()
    )
    .increment(1);
}

/// 记录注入的错误响应
#[inline]
pub fn record_injected_error(scenario: &str, status: u16) {
    metrics::counter!(
        "synth_injected_errors_total",
        "scenario" => scenario.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

//! 命令执行器
//!
//! 负责执行各 CLI 子命令的具体逻辑。

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tracing::{info, warn};

use synth_shared::config::AppConfig;

use crate::middleware::AuthState;
use crate::routes::build_router;
use crate::scenarios::{LoadReport, Scenario, ScenarioRegistry, as_millis_u64, load_scenario_file};
use crate::state::AppState;

/// 命令执行器
///
/// 持有已加载的配置，作为 CLI 与服务逻辑之间的桥梁。
pub struct CommandRunner {
    config: AppConfig,
}

impl CommandRunner {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    fn scenarios_dir(&self, override_dir: Option<PathBuf>) -> PathBuf {
        override_dir.unwrap_or_else(|| self.config.scenarios.dir.clone())
    }

    fn load_registry(&self, dir: &Path) -> (ScenarioRegistry, LoadReport) {
        ScenarioRegistry::load(Some(dir), &self.config.limits)
    }

    /// 执行 serve 命令
    ///
    /// 构建场景注册表后启动 HTTP 服务，收到 Ctrl+C 时等待在途请求结束再退出。
    pub async fn run_serve(
        &self,
        port: Option<u16>,
        scenarios_dir: Option<PathBuf>,
        metrics: Option<PrometheusHandle>,
    ) -> Result<()> {
        let dir = self.scenarios_dir(scenarios_dir);
        let (registry, report) = self.load_registry(&dir);
        for skipped in &report.skipped {
            warn!(origin = %skipped.origin, error = %skipped.error, "场景未加载");
        }

        let state = AppState::new(Arc::new(registry), self.config.limits.clone())
            .with_metrics(metrics);
        let auth = AuthState::from_config(&self.config.auth);
        let app = build_router(state, auth, &self.config.server.cors_origins);

        let mut config = self.config.clone();
        if let Some(port) = port {
            config.server.port = port;
        }
        let addr = config.server_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("绑定地址失败: {}", addr))?;

        info!(
            addr = %addr,
            environment = %config.environment,
            scenarios_dir = %dir.display(),
            builtin = report.builtin,
            user = report.user,
            "合成 API 服务已启动"
        );
        info!("可用端点: /stream, /paginated, /large, /scenarios, /api/endpoints, /health, /ready, /metrics");
        info!("按 Ctrl+C 停止服务");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("服务器运行失败")?;

        info!("合成 API 服务已停止");
        Ok(())
    }

    /// 执行 verify 命令
    pub fn run_verify(&self, path: &Path) -> Result<()> {
        match load_scenario_file(path) {
            Ok(scenario) => {
                println!("{}", format_summary(&scenario));
                Ok(())
            }
            Err(e) => {
                eprintln!("场景校验失败: {}", e);
                bail!("场景文件无效: {}", path.display())
            }
        }
    }

    /// 执行 list 命令
    pub fn run_list(&self, scenarios_dir: Option<PathBuf>) -> Result<()> {
        let dir = self.scenarios_dir(scenarios_dir);
        let (registry, report) = self.load_registry(&dir);
        println!("{}", format_registry(&registry, &report));
        Ok(())
    }
}

/// 场景摘要（verify 输出）
pub fn format_summary(scenario: &Scenario) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "场景校验通过");
    let _ = writeln!(out, "{}", "-".repeat(40));
    let _ = writeln!(out, "名称:       {}", scenario.name);
    let _ = writeln!(out, "类型:       {}", scenario.scenario_type);
    let _ = writeln!(out, "延迟策略:   {}", scenario.delay_strategy);
    let _ = writeln!(out, "基础延迟:   {} ms", as_millis_u64(scenario.base_delay));
    let _ = writeln!(out, "批次大小:   {}", scenario.batch_size);
    let _ = writeln!(
        out,
        "数量限制:   max={} default={}",
        scenario.limits.max_count, scenario.limits.default_count
    );
    let _ = writeln!(out, "ServiceNow: {}", scenario.record_mode);

    let mut sections = Vec::new();
    if let Some(injection) = &scenario.error_injection {
        sections.push(format!(
            "error_injection(rate={}, codes={:?})",
            injection.error_rate, injection.error_codes
        ));
    }
    if let Some(monitoring) = &scenario.performance_monitoring {
        sections.push(format!(
            "performance_monitoring(interval={}ms)",
            as_millis_u64(monitoring.metrics_interval)
        ));
    }
    let enabled = if sections.is_empty() {
        "无".to_string()
    } else {
        sections.join(", ")
    };
    let _ = write!(out, "启用功能:   {}", enabled);
    out
}

/// 注册表列表（list 输出）
pub fn format_registry(registry: &ScenarioRegistry, report: &LoadReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "已加载场景 ({}):", registry.len());
    let _ = writeln!(out, "{}", "-".repeat(72));
    for scenario in registry.scenarios() {
        let _ = writeln!(
            out,
            "  {:<16} {:<24} {:<12} {:>6} ms  batch={:<5} [{}]",
            scenario.scenario_type,
            scenario.name,
            scenario.delay_strategy,
            as_millis_u64(scenario.base_delay),
            scenario.batch_size,
            scenario.source.label()
        );
    }
    let _ = writeln!(out, "{}", "-".repeat(72));
    if !report.overridden.is_empty() {
        let _ = writeln!(out, "用户覆盖: {}", report.overridden.join(", "));
    }
    for skipped in &report.skipped {
        let _ = writeln!(out, "已跳过: {} ({})", skipped.origin, skipped.error);
    }
    out
}

/// 等待关闭信号
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "安装 CTRL+C 信号处理器失败，服务将持续运行");
        std::future::pending::<()>().await;
    }
    info!("收到关闭信号，正在停止服务...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn runner() -> CommandRunner {
        CommandRunner::new(AppConfig::default())
    }

    #[test]
    fn test_verify_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.json");
        fs::write(
            &path,
            r#"{"scenario_name": "Slow Search", "scenario_type": "custom_search",
                "base_delay": "1.5s", "error_injection": {"enabled": true, "error_rate": 0.1}}"#,
        )
        .unwrap();

        assert!(runner().run_verify(&path).is_ok());

        let summary = format_summary(&load_scenario_file(&path).unwrap());
        assert!(summary.contains("custom_search"));
        assert!(summary.contains("1500 ms"));
        assert!(summary.contains("error_injection"));
    }

    #[test]
    fn test_verify_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(
            &path,
            r#"{"scenario_name": "x", "scenario_type": "custom", "base_delay": "soon"}"#,
        )
        .unwrap();

        assert!(runner().run_verify(&path).is_err());
        assert!(runner().run_verify(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_list_with_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("peak.json"),
            r#"{"scenario_name": "Custom Peak", "scenario_type": "peak_hours", "base_delay": 10}"#,
        )
        .unwrap();

        let runner = runner();
        let (registry, report) = runner.load_registry(dir.path());
        let listing = format_registry(&registry, &report);
        assert!(listing.contains("Custom Peak"));
        assert!(listing.contains("用户覆盖: peak_hours"));
        assert!(runner.run_list(Some(dir.path().to_path_buf())).is_ok());
    }
}

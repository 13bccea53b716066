//! 应用共享状态

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use synth_shared::config::LimitsConfig;

use crate::pagination::PageLimits;
use crate::scenarios::ScenarioRegistry;

/// 所有路由共享的只读状态
///
/// 注册表在启动时构建完成，请求处理期间不再修改。
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ScenarioRegistry>,
    pub limits: LimitsConfig,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(registry: Arc<ScenarioRegistry>, limits: LimitsConfig) -> Self {
        Self {
            registry,
            limits,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }

    /// 仅包含内置场景与默认限制（测试用）
    pub fn builtin() -> Self {
        let limits = LimitsConfig::default();
        Self::new(Arc::new(ScenarioRegistry::builtin(&limits)), limits)
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            max_page_size: self.limits.max_page_size,
            default_page_size: self.limits.default_page_size,
        }
    }
}

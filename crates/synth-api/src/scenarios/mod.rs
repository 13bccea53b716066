//! 场景模块
//!
//! 场景描述一种模拟条件：基础延迟、延迟策略、记录形态与数量限制。
//!
//! # 模块结构
//!
//! - `duration` - 时长字符串解析
//! - `model` - 场景文件与校验后的场景结构
//! - `validation` - 字段级校验与版本兼容性检查
//! - `builtin` - 编译期嵌入的内置场景
//! - `registry` - 内置 + 用户场景的只读注册表
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use synth_api::scenarios::ScenarioRegistry;
//! use synth_shared::config::LimitsConfig;
//!
//! let (registry, report) = ScenarioRegistry::load(Some(Path::new("scenarios")), &LimitsConfig::default());
//! let peak = registry.resolve("peak_hours");
//! ```

mod builtin;
pub mod duration;
mod model;
mod registry;
mod validation;

pub use builtin::BUILTIN_SCENARIOS;
pub use duration::{DurationError, as_millis_u64, parse_duration, parse_query_delay};
pub use model::{
    DEFAULT_BATCH_SIZE, DEFAULT_COUNT, DEFAULT_MAX_COUNT, DelayStrategy, ErrorInjection,
    PerformanceMonitoring, ResponseLimits, Scenario, ScenarioBehavior, ScenarioFile,
    ScenarioMetadata, ScenarioSource, ServiceNowConfig, is_recognized_type,
};
pub use registry::{LoadReport, ScenarioConfig, ScenarioRegistry, SkippedScenario};
pub use validation::{
    MAX_BATCH_SIZE, ScenarioError, check_compatibility, current_version, load_scenario_file,
    validate,
};

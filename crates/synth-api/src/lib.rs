//! Synth API
//!
//! 场景驱动的合成 API 服务，用于在 REST 客户端测试中复现大响应、慢响应与分页消费等条件。
//!
//! # 主要模块
//!
//! - `scenarios`: 场景模型、校验与注册表
//! - `delay`: 延迟策略与可中断等待
//! - `generators`: 按序号生成合成记录
//! - `streaming`: 分块输出 JSON 数组
//! - `pagination`: 三种分页寻址方式的解析
//! - `services`: HTTP 端点
//!
//! # 使用示例
//!
//! ```rust
//! use synth_api::delay::DelayPlan;
//! use synth_api::generators::generate;
//! use synth_api::scenarios::ScenarioRegistry;
//! use synth_shared::config::LimitsConfig;
//!
//! let registry = ScenarioRegistry::builtin(&LimitsConfig::default());
//! let peak = registry.resolve("peak_hours").unwrap();
//!
//! let plan = DelayPlan::from_scenario(&peak);
//! assert_eq!(plan.compute(1).as_millis(), 200);
//!
//! let record = generate(42, true);
//! assert_eq!(record.servicenow.unwrap().number, "INC0000042");
//! ```

pub mod cli;
pub mod delay;
pub mod docs;
pub mod error;
pub mod generators;
pub mod middleware;
pub mod pagination;
pub mod routes;
pub mod scenarios;
pub mod services;
pub mod state;
pub mod streaming;

pub use error::{ApiError, ApiResult};
pub use routes::build_router;
pub use state::AppState;

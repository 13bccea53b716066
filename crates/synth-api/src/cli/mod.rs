//! CLI 模块
//!
//! 提供命令行接口，支持以下功能：
//!
//! - `serve` - 启动合成 API 服务
//! - `verify` - 校验单个场景文件
//! - `list` - 列出合并后的场景注册表
//!
//! # 使用示例
//!
//! ```bash
//! # 启动服务器
//! synth-server serve --port 8080 --scenarios-dir ./scenarios
//!
//! # 校验场景文件
//! synth-server verify ./scenarios/slow_search.json
//!
//! # 查看生效的场景
//! synth-server list
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::CommandRunner;

//! CLI 命令定义
//!
//! 使用 clap derive 宏定义命令行接口结构。

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// 合成 API 服务命令行工具
///
/// 使用 `--help` 查看各子命令的详细说明。
#[derive(Parser, Debug)]
#[command(name = "synth-server")]
#[command(version, about = "场景驱动的合成 API 服务")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)，覆盖配置文件
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// 配置文件目录
    #[arg(long, global = true, env = "SYNTH_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 子命令枚举
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 启动 HTTP 服务
    ///
    /// 加载内置场景与场景目录中的用户场景后开始监听，Ctrl+C 优雅退出。
    Serve {
        /// 服务端口（覆盖配置文件）
        #[arg(short, long)]
        port: Option<u16>,

        /// 用户场景目录（覆盖配置文件）
        #[arg(short, long)]
        scenarios_dir: Option<PathBuf>,
    },

    /// 校验单个场景文件
    ///
    /// 成功时输出场景摘要，失败时输出字段级错误并以非零状态退出。
    Verify {
        /// 场景文件路径（JSON）
        path: PathBuf,
    },

    /// 列出合并后的场景注册表
    List {
        /// 用户场景目录（覆盖配置文件）
        #[arg(short, long)]
        scenarios_dir: Option<PathBuf>,
    },
}

// ============================================================================
// 单元测试
// ============================================================================

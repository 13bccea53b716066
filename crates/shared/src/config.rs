//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Result, SynthError};

/// 服务配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 允许的跨域来源，逗号分隔；`*` 表示任意来源
    pub cors_origins: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: "*".to_string(),
        }
    }
}

/// 场景目录配置
///
/// 用户自定义场景文件所在目录，目录不存在时只加载内置场景
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScenariosConfig {
    pub dir: PathBuf,
}

impl Default for ScenariosConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("scenarios"),
        }
    }
}

/// 请求数量限制
///
/// 未指定场景或场景未声明限制时使用这些值
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// 单次请求允许的最大记录数
    pub max_count: u64,
    /// 未指定 count/total 时的默认记录数
    pub default_count: u64,
    /// 流式输出默认刷新批次大小
    pub default_batch_size: usize,
    /// 分页最大页大小
    pub max_page_size: u64,
    /// 分页参数无效时使用的页大小
    pub default_page_size: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_count: 1_000_000,
            default_count: 10_000,
            default_batch_size: 100,
            max_page_size: 1000,
            default_page_size: 100,
        }
    }
}

/// 认证配置
///
/// 启用后，除健康检查外的所有端点都需要 Basic 认证或 X-API-Key
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_keys: Vec<String>,
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 是否启用 JSON 格式日志
    pub json_logs: bool,
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub server: ServerConfig,
    pub scenarios: ScenariosConfig,
    pub limits: LimitsConfig,
    pub auth: AuthConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从默认配置目录加载
    ///
    /// 配置目录优先取 SYNTH_CONFIG_DIR，否则为 `config`
    pub fn load(service_name: &str) -> Result<Self> {
        let config_dir =
            std::env::var("SYNTH_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
        Self::load_from(service_name, Path::new(&config_dir))
    }

    /// 从指定目录加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. 代码内默认值
    /// 2. {config_dir}/default.toml
    /// 3. {config_dir}/{environment}.toml
    /// 4. {config_dir}/{service_name}.toml
    /// 5. 环境变量（SYNTH_ 前缀，`__` 分隔层级，如 SYNTH_SERVER__PORT -> server.port）
    pub fn load_from(service_name: &str, config_dir: &Path) -> Result<Self> {
        let env = std::env::var("SYNTH_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", env))).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", service_name))).required(false),
            )
            .add_source(
                Environment::with_prefix("SYNTH")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.api_keys")
                    .try_parsing(true),
            );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 校验跨字段约束
    pub fn validate(&self) -> Result<()> {
        let limits = &self.limits;
        if limits.max_count == 0 {
            return Err(invalid("limits.max_count", "必须大于 0"));
        }
        if limits.default_count == 0 || limits.default_count > limits.max_count {
            return Err(invalid(
                "limits.default_count",
                &format!("必须在 1..={} 之间", limits.max_count),
            ));
        }
        if limits.default_batch_size == 0 {
            return Err(invalid("limits.default_batch_size", "必须大于 0"));
        }
        if limits.default_page_size == 0 || limits.default_page_size > limits.max_page_size {
            return Err(invalid(
                "limits.default_page_size",
                &format!("必须在 1..={} 之间", limits.max_page_size),
            ));
        }
        if self.auth.enabled {
            let has_basic = self.auth.username.is_some() && self.auth.password.is_some();
            if !has_basic && self.auth.api_keys.is_empty() {
                return Err(invalid(
                    "auth",
                    "启用认证时必须配置 username/password 或 api_keys",
                ));
            }
        }
        Ok(())
    }

    /// 获取服务地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn invalid(field: &str, message: &str) -> SynthError {
    SynthError::InvalidConfig {
        field: field.to_string(),
        message: message.to_string(),
    }
}

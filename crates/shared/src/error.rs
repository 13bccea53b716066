//! 统一错误处理模块
//!
//! 定义各 crate 共享的基础错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("配置加载失败: {0}")]
    Config(#[from] config::ConfigError),

    #[error("配置项无效: {field} - {message}")]
    InvalidConfig { field: String, message: String },
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, SynthError>;

impl SynthError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = SynthError::InvalidConfig {
            field: "limits.max_count".to_string(),
            message: "必须大于 0".to_string(),
        };
        assert_eq!(err.code(), "INVALID_CONFIG");
        assert_eq!(err.to_string(), "配置项无效: limits.max_count - 必须大于 0");
    }

    #[test]
    fn test_config_error_code() {
        let err = SynthError::from(config::ConfigError::NotFound("server".to_string()));
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}

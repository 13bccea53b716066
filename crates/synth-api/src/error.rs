//! HTTP 错误类型
//!
//! 所有错误响应统一为 `{"success": false, "code": ..., "message": ...}`。

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// 认证失败时返回的质询头
pub const AUTH_CHALLENGE: &str = r#"Basic realm="synth-api""#;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("参数 `{name}` 无效: {message}")]
    InvalidParameter { name: &'static str, message: String },

    #[error("未知场景 `{name}`，可用场景: {}", .known.join(", "))]
    UnknownScenario { name: String, known: Vec<String> },

    #[error("场景不存在: {0}")]
    ScenarioNotFound(String),

    #[error("场景 `{scenario}` 注入的模拟错误 (HTTP {status})")]
    Injected { scenario: String, status: u16 },

    #[error("未授权: {0}")]
    Unauthorized(String),

    #[error("指标导出未启用")]
    MetricsDisabled,

    #[error("内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidParameter { .. } | Self::UnknownScenario { .. } => StatusCode::BAD_REQUEST,
            Self::ScenarioNotFound(_) | Self::MetricsDisabled => StatusCode::NOT_FOUND,
            Self::Injected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidParameter { .. } => "INVALID_PARAMETER",
            Self::UnknownScenario { .. } => "UNKNOWN_SCENARIO",
            Self::ScenarioNotFound(_) => "SCENARIO_NOT_FOUND",
            Self::Injected { .. } => "INJECTED_ERROR",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::MetricsDisabled => "METRICS_DISABLED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
        });

        let mut response = (status, axum::Json(body)).into_response();
        if matches!(self, Self::Unauthorized(_)) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(AUTH_CHALLENGE),
            );
        }
        response
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

//! 认证中间件
//!
//! 接受 HTTP Basic 认证或 X-API-Key 头部，任一通过即放行。
//! 凭据以 SHA256 摘要保存和比较，配置中的明文在启动后即被丢弃。

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use synth_shared::config::AuthConfig;

use crate::error::ApiError;

/// API Key Header 名称
const API_KEY_HEADER: &str = "X-API-Key";

/// 公开路由（不需要认证）
const PUBLIC_PATHS: [&str; 2] = ["/health", "/ready"];

type Digest32 = [u8; 32];

fn sha256(input: &[u8]) -> Digest32 {
    Sha256::digest(input).into()
}

/// 认证凭据（仅保存摘要）
#[derive(Debug, Clone)]
pub struct AuthState {
    basic: Option<(String, Digest32)>,
    api_keys: Vec<Digest32>,
}

impl AuthState {
    /// 从配置构建；未启用认证时返回 None
    pub fn from_config(config: &AuthConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        let basic = match (&config.username, &config.password) {
            (Some(user), Some(password)) if !user.is_empty() => {
                Some((user.clone(), sha256(password.as_bytes())))
            }
            _ => None,
        };
        let api_keys = config
            .api_keys
            .iter()
            .filter(|k| !k.is_empty())
            .map(|k| sha256(k.as_bytes()))
            .collect();

        Some(Self { basic, api_keys })
    }

    fn check_api_key(&self, key: &str) -> bool {
        let digest = sha256(key.as_bytes());
        self.api_keys.iter().any(|k| *k == digest)
    }

    fn check_basic(&self, encoded: &str) -> bool {
        let Some((user, password_digest)) = &self.basic else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let Ok(credentials) = String::from_utf8(decoded) else {
            return false;
        };
        match credentials.split_once(':') {
            Some((u, p)) => u == user && sha256(p.as_bytes()) == *password_digest,
            None => false,
        }
    }

    /// 校验请求头
    pub fn authenticate(&self, request: &Request<Body>) -> Result<(), ApiError> {
        let headers = request.headers();

        if let Some(key) = headers.get(API_KEY_HEADER) {
            let key = key
                .to_str()
                .map_err(|_| ApiError::Unauthorized("API Key 编码无效".to_string()))?;
            return if self.check_api_key(key) {
                Ok(())
            } else {
                Err(ApiError::Unauthorized("API Key 无效".to_string()))
            };
        }

        let auth_header = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());
        match auth_header.and_then(|h| h.strip_prefix("Basic ")) {
            Some(encoded) if self.check_basic(encoded) => Ok(()),
            Some(_) => Err(ApiError::Unauthorized("用户名或密码错误".to_string())),
            None => Err(ApiError::Unauthorized("缺少认证信息".to_string())),
        }
    }
}

/// 认证中间件
///
/// 公开路由直接放行；其余请求校验失败时返回 401 与 Basic 质询头。
pub async fn auth_middleware(
    State(auth): State<Arc<AuthState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if PUBLIC_PATHS.contains(&path) {
        return next.run(request).await;
    }

    match auth.authenticate(&request) {
        Ok(()) => {
            debug!(path = %path, "认证通过");
            next.run(request).await
        }
        Err(e) => {
            warn!(path = %path, error = %e, "认证失败");
            e.into_response()
        }
    }
}

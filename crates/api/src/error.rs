//! # API 统一错误处理
//!
//! 将代理层的失败映射到 HTTP 状态码与 JSON 响应体。

use aurum_proxy::orchestrator::ProxyError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::types::FailureResponse;

/// API 层统一错误枚举
#[derive(Error, Debug)]
pub enum ApiError {
    /// 未映射的路径 (404，空响应体)
    #[error("no route for path")]
    NotFound,

    /// 回源失败且无缓存可兜底 (500)
    #[error("gold price unavailable: {0}")]
    Unavailable(#[from] ProxyError),
}

/// 将 `ApiError` 转换为 axum 的 HTTP 响应
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::Unavailable(cause) => {
                // 只返回摘要，不透传上游响应体
                let body = Json(FailureResponse::from_error(cause.to_string()));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

use axum::Json;
use axum::extract::{OriginalUri, State};
use axum::http::header::{CACHE_CONTROL, WARNING};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use aurum_proxy::orchestrator::{Outcome, cache_key};

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{FailureResponse, GoldPriceResponse};

/// 陈旧兜底时附带的 `Warning` 头
const STALE_WARNING: &str = "110 - Response is stale";

/// 获取金价快照
///
/// 新鲜缓存直接返回；否则回源刷新。回源失败时使用旧缓存兜底，
/// 兜底数据带 `stale: true` 与 `Warning: 110` 头；无缓存可用时返回 500。
/// 该路径上的其他方法同样由本 Handler 处理，缓存键按方法区分。
#[utoipa::path(
    get,
    path = "/api/goldprice",
    tag = "金价 (Gold)",
    responses(
        (status = 200, description = "金价快照 (新鲜或陈旧兜底)", body = GoldPriceResponse,
            headers(
                ("Cache-Control" = String, description = "新鲜数据时为 public, max-age=<窗口秒数>"),
                ("Warning" = String, description = "陈旧兜底时为 110 - Response is stale")
            )
        ),
        (status = 500, description = "上游不可用且无缓存", body = FailureResponse)
    )
)]
pub async fn get_gold_price(
    method: Method,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, ApiError> {
    let path_and_query = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string);
    let key = cache_key(method.as_str(), &path_and_query);

    // 后台写入句柄直接丢弃，写入独立于本次响应完成
    let reply = state.gold_price.serve(key).await;
    let outcome_label = reply.outcome.label();
    tracing::debug!(outcome = outcome_label, "gold price request resolved");

    match reply.outcome {
        Outcome::CacheHit(entry) | Outcome::Refreshed(entry) => {
            let cache_control = format!("public, max-age={}", entry.max_age_secs);
            let mut response = Json(GoldPriceResponse::from(entry.snapshot)).into_response();
            match HeaderValue::from_str(&cache_control) {
                Ok(value) => {
                    response.headers_mut().insert(CACHE_CONTROL, value);
                }
                Err(e) => tracing::warn!("invalid Cache-Control value {}: {}", cache_control, e),
            }
            Ok(response)
        }
        Outcome::Stale { entry, .. } => {
            let mut response = (
                StatusCode::OK,
                Json(GoldPriceResponse::stale(entry.snapshot)),
            )
                .into_response();
            response
                .headers_mut()
                .insert(WARNING, HeaderValue::from_static(STALE_WARNING));
            Ok(response)
        }
        Outcome::Failed(cause) => Err(ApiError::Unavailable(cause)),
    }
}

/// 未映射的路径：404，空响应体
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

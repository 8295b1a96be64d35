use crate::price::error::UpstreamError;
use async_trait::async_trait;
use serde_json::Value;

/// # Summary
/// 上游金价数据源行为契约。
///
/// # Invariants
/// - 调用之间无状态，每次调用独立完成 "请求 + 有限重试"。
/// - 返回的载荷未经校验，必须交给规范化器处理后才能使用。
#[async_trait]
pub trait UpstreamFeed: Send + Sync {
    /// # Summary
    /// 抓取一次上游原始 JSON 载荷。
    ///
    /// # Returns
    /// 成功返回未经校验的 JSON 值，失败返回 `UpstreamError`。
    async fn fetch_upstream(&self) -> Result<Value, UpstreamError>;
}

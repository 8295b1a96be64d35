use aurum_core::cache::port::{Cache, EntryCacheExt};
use aurum_core::common::time::TimeProvider;
use aurum_core::price::entity::CacheEntry;
use aurum_core::price::error::{UpstreamError, ValidationError};
use aurum_core::price::port::UpstreamFeed;
use aurum_feed::normalize::normalize;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// # Summary
/// 代理层的统一错误类型。
///
/// # Invariants
/// - 前三类均先尝试陈旧兜底，只有无缓存可用时才暴露给调用方。
/// - 错误信息只包含摘要，不透传上游响应体。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    #[error("{0}")]
    NetworkUnreachable(String),
    #[error("HTTP error! status: {0}")]
    UpstreamHttp(u16),
    #[error("{0}")]
    Validation(String),
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),
    // 编排任务异常终止 (panic 或运行时关闭)
    #[error("Request handling aborted: {0}")]
    Aborted(String),
}

impl From<UpstreamError> for ProxyError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Unreachable { .. } => ProxyError::NetworkUnreachable(err.to_string()),
            UpstreamError::HttpStatus(code) => ProxyError::UpstreamHttp(code),
            UpstreamError::Body(_) => ProxyError::Validation(err.to_string()),
        }
    }
}

impl From<ValidationError> for ProxyError {
    fn from(err: ValidationError) -> Self {
        ProxyError::Validation(err.to_string())
    }
}

/// # Summary
/// 单次请求的终态。
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    // 缓存中存在新鲜条目，原样返回
    CacheHit(CacheEntry),
    // 回源并规范化成功，新条目已提交后台写入
    Refreshed(CacheEntry),
    // 回源失败，使用缓存中的旧条目兜底
    Stale { entry: CacheEntry, cause: ProxyError },
    // 回源失败且无可用缓存
    Failed(ProxyError),
}

impl Outcome {
    /// 终态的简短名称，用于日志
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::CacheHit(_) => "cache_hit",
            Outcome::Refreshed(_) => "refreshed",
            Outcome::Stale { .. } => "stale_fallback",
            Outcome::Failed(_) => "hard_failure",
        }
    }
}

/// # Summary
/// 编排结果：终态加上可能存在的后台缓存写入任务。
///
/// # Invariants
/// - `pending_write` 仅在 `Outcome::Refreshed` 时存在。
/// - 调用方无需等待 `pending_write`；丢弃句柄不会取消写入。
#[derive(Debug)]
pub struct Reply {
    pub outcome: Outcome,
    pub pending_write: Option<JoinHandle<()>>,
}

impl Reply {
    fn done(outcome: Outcome) -> Self {
        Self {
            outcome,
            pending_write: None,
        }
    }
}

/// # Summary
/// 由请求方法与路径 (含查询串) 派生缓存键，对应边缘缓存按请求 URL 寻址。
pub fn cache_key(method: &str, path_and_query: &str) -> String {
    format!("{} {}", method, path_and_query)
}

/// # Summary
/// 金价缓存代理服务，编排缓存、上游与规范化器。
/// 编译期仅依赖 `aurum-core` 中的 Trait 定义，所有具体实现通过构造函数注入。
///
/// # Invariants
/// - 服务本身不持有可变状态，并发请求之间只共享缓存底座。
/// - 永不修改已存储的条目，只整体替换。
/// - 不做同键请求合并：并发未命中会各自回源。
pub struct GoldPriceService {
    // 上游数据源
    feed: Arc<dyn UpstreamFeed>,
    // 缓存底座
    cache: Arc<dyn Cache>,
    clock: Arc<dyn TimeProvider>,
    // 新鲜度窗口 (秒)
    max_age_secs: u64,
}

impl GoldPriceService {
    /// # Summary
    /// 创建 GoldPriceService 实例。
    ///
    /// # Arguments
    /// * `feed` - 上游数据源实现。
    /// * `cache` - 缓存底座实现。
    /// * `clock` - 时间供给器。
    /// * `max_age_secs` - 新鲜度窗口。
    ///
    /// # Returns
    /// * `Arc<Self>` - 可共享的服务实例。
    pub fn new(
        feed: Arc<dyn UpstreamFeed>,
        cache: Arc<dyn Cache>,
        clock: Arc<dyn TimeProvider>,
        max_age_secs: u64,
    ) -> Arc<Self> {
        Arc::new(Self {
            feed,
            cache,
            clock,
            max_age_secs,
        })
    }

    /// # Summary
    /// 在独立协程中处理请求。
    ///
    /// # Logic
    /// 1. 将 `handle` 放入新协程，调用方中途放弃时回源与缓存写入仍会完成。
    /// 2. 协程 panic 或被取消时转为 `Failed(Aborted)`，不向外抛出。
    pub async fn serve(self: &Arc<Self>, key: String) -> Reply {
        let service = Arc::clone(self);
        match tokio::spawn(async move { service.handle(&key).await }).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Gold price handler task failed: {}", e);
                Reply::done(Outcome::Failed(ProxyError::Aborted(e.to_string())))
            }
        }
    }

    /// # Summary
    /// 处理一次金价请求。
    ///
    /// # Logic
    /// 1. CacheHit: 缓存存在新鲜条目，直接返回。读缓存失败视为未命中。
    /// 2. UpstreamAttempt: 调用上游 (内部含重试)，失败转入陈旧兜底。
    /// 3. Normalized: 规范化载荷，失败转入陈旧兜底；成功则提交后台写入并返回。
    ///
    /// # Arguments
    /// * `key` - 由 `cache_key` 派生的缓存键。
    pub async fn handle(&self, key: &str) -> Reply {
        match self.cache.get_entry(key).await {
            Ok(Some(entry)) if entry.is_fresh(self.clock.now()) => {
                debug!(key, stored_at = %entry.stored_at, "serving fresh cache entry");
                return Reply::done(Outcome::CacheHit(entry));
            }
            Ok(Some(entry)) => {
                debug!(key, expired_at = %entry.expires_at(), "cache entry expired, refreshing");
            }
            Ok(None) => debug!(key, "cache miss"),
            Err(e) => warn!(key, "Cache read failed, treating as miss: {}", e),
        }

        let raw = match self.feed.fetch_upstream().await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Error fetching gold price: {}", e);
                return self.stale_fallback(key, e.into()).await;
            }
        };

        let snapshot = match normalize(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Error normalizing gold price payload: {}", e);
                return self.stale_fallback(key, e.into()).await;
            }
        };

        let entry = CacheEntry::new(snapshot, self.clock.now(), self.max_age_secs);
        info!(key, quotes = entry.snapshot.quotes.len(), "gold price refreshed from upstream");
        let pending = self.spawn_write(key, entry.clone());
        Reply {
            outcome: Outcome::Refreshed(entry),
            pending_write: Some(pending),
        }
    }

    /// # Summary
    /// 陈旧兜底：重新读取缓存中任意条目 (含已过期)。
    ///
    /// # Logic
    /// 1. 读到条目则返回 `Stale`，保留原始失败原因。
    /// 2. 无条目或读取失败则返回 `Failed`，错误信息仍为原始失败原因。
    async fn stale_fallback(&self, key: &str, cause: ProxyError) -> Reply {
        match self.cache.get_entry(key).await {
            Ok(Some(entry)) => {
                warn!(key, stored_at = %entry.stored_at, "serving stale cache entry: {}", cause);
                Reply::done(Outcome::Stale { entry, cause })
            }
            Ok(None) => {
                error!(key, "no cached gold price to fall back on: {}", cause);
                Reply::done(Outcome::Failed(cause))
            }
            Err(e) => {
                error!(key, "Error accessing cache: {}", e);
                Reply::done(Outcome::Failed(cause))
            }
        }
    }

    /// # Summary
    /// 提交后台缓存写入，不阻塞响应。
    fn spawn_write(&self, key: &str, entry: CacheEntry) -> JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        let key = key.to_string();
        tokio::spawn(async move {
            match cache.put_entry(&key, &entry).await {
                Ok(()) => debug!(key, "cache entry stored"),
                Err(e) => warn!(key, "Background cache write failed: {}", e),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_includes_query() {
        assert_eq!(cache_key("GET", "/api/goldprice"), "GET /api/goldprice");
        assert_ne!(
            cache_key("GET", "/api/goldprice"),
            cache_key("GET", "/api/goldprice?v=2")
        );
    }

    #[test]
    fn test_upstream_errors_map_to_taxonomy() {
        let unreachable = UpstreamError::Unreachable {
            attempts: 3,
            last_error: "timed out".to_string(),
        };
        assert!(matches!(
            ProxyError::from(unreachable),
            ProxyError::NetworkUnreachable(_)
        ));
        assert_eq!(
            ProxyError::from(UpstreamError::HttpStatus(502)),
            ProxyError::UpstreamHttp(502)
        );
        assert_eq!(
            ProxyError::from(UpstreamError::HttpStatus(502)).to_string(),
            "HTTP error! status: 502"
        );
        assert!(matches!(
            ProxyError::from(ValidationError::MissingData),
            ProxyError::Validation(_)
        ));
    }
}

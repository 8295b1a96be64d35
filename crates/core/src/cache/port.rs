use crate::cache::error::CacheError;
use crate::price::entity::CacheEntry;
use async_trait::async_trait;

/// # Summary
/// 业务无关的异步 KV 存储接口 (Port)，对应边缘节点的缓存底座。
///
/// # Invariants
/// - 处理原始字节，确保 Trait 是对象安全的 (Object Safe)。
/// - 并发读写安全，同一键的并发写入遵循 "最后写入者获胜"。
/// - 底座可以在条目过期后的任意时刻物理淘汰它，但在淘汰前读取仍然可见。
#[async_trait]
pub trait Cache: Send + Sync {
    /// # Summary
    /// 设置原始字节数据，整体替换同名键的旧值。
    ///
    /// # Arguments
    /// * `key`: 唯一键。
    /// * `value`: 原始字节数组。
    ///
    /// # Returns
    /// 成功返回 Ok，失败返回 `CacheError`。
    async fn set_raw(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;

    /// # Summary
    /// 获取原始字节数据。
    ///
    /// # Arguments
    /// * `key`: 唯一键。
    ///
    /// # Returns
    /// 存在则返回 `Some(Vec<u8>)`，否则返回 `None`。
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// # Summary
    /// 删除指定键。
    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

/// # Summary
/// 面向缓存条目的扩展接口，把 `CacheEntry` 以 JSON 形式落入字节底座。
///
/// # Invariants
/// - 自动为所有实现 `Cache` 的类型（包括 `dyn Cache`）提供支持。
/// - 条目只会被整体替换，不做字段级合并。
#[async_trait]
pub trait EntryCacheExt: Cache {
    /// # Summary
    /// 读取缓存条目，不区分新鲜与过期。
    ///
    /// # Logic
    /// 1. 调用底层 `get_raw` 获取字节。
    /// 2. 反序列化为 `CacheEntry`，失败返回 `CacheError::Deserialize`。
    async fn get_entry(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let Some(bytes) = self.get_raw(key).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| CacheError::Deserialize(e.to_string()))
    }

    /// # Summary
    /// 写入缓存条目，整体覆盖旧条目。
    async fn put_entry(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(entry).map_err(|e| CacheError::Serialize(e.to_string()))?;
        self.set_raw(key, bytes).await
    }
}

impl<T: Cache + ?Sized> EntryCacheExt for T {}

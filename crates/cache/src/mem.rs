use async_trait::async_trait;
use aurum_core::cache::error::CacheError;
use aurum_core::cache::port::Cache;
use aurum_core::common::time::{RealTimeProvider, TimeProvider};
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// 单个槽位：写入时间 + 原始字节
struct Slot {
    stored_at: DateTime<Utc>,
    bytes: Vec<u8>,
}

/// # Summary
/// 基于 DashMap 的内存缓存底座。
///
/// # Invariants
/// - 所有操作均通过并发哈希表 `DashMap` 执行，保证多线程安全，同键写入最后者获胜。
/// - 新鲜度由上层按条目自行判断；底座只负责在超过保留期后物理淘汰。
/// - 未设置保留期时条目永不淘汰。
pub struct MemCache {
    // 线程安全的 KV 存储容器
    storage: DashMap<String, Slot>,
    // 物理淘汰阈值
    retention: Option<TimeDelta>,
    clock: Arc<dyn TimeProvider>,
}

impl MemCache {
    /// # Summary
    /// 创建一个不做淘汰的 MemCache 实例。
    pub fn new() -> Self {
        Self {
            storage: DashMap::new(),
            retention: None,
            clock: Arc::new(RealTimeProvider),
        }
    }

    /// # Summary
    /// 创建一个带保留期的 MemCache 实例。
    ///
    /// # Logic
    /// 1. 将 `std::time::Duration` 转换为 `TimeDelta`，超出范围时视为不淘汰。
    ///
    /// # Arguments
    /// * `retention`: 条目的最大保留时长。
    /// * `clock`: 时间供给器，测试中可注入虚拟时钟。
    pub fn with_retention(retention: Duration, clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            storage: DashMap::new(),
            retention: TimeDelta::from_std(retention).ok(),
            clock,
        }
    }

    /// 当前持有的条目数量 (含已过期但尚未淘汰的)
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    fn is_evictable(&self, slot: &Slot, now: DateTime<Utc>) -> bool {
        match self.retention {
            Some(retention) => now.signed_duration_since(slot.stored_at) >= retention,
            None => false,
        }
    }

    /// # Summary
    /// 淘汰所有超过保留期的条目。
    ///
    /// # Returns
    /// 被淘汰的条目数量。
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.storage.len();
        self.storage.retain(|_, slot| !self.is_evictable(slot, now));
        let purged = before.saturating_sub(self.storage.len());
        if purged > 0 {
            debug!("MemCache purged {} expired entries", purged);
        }
        purged
    }

    /// # Summary
    /// 启动后台清扫任务，按固定间隔淘汰过期条目。
    ///
    /// # Logic
    /// 1. 仅持有弱引用，缓存被释放后任务自动退出。
    /// 2. 每个周期调用一次 `purge_expired`。
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            info!("MemCache sweeper started, interval {:?}", every);
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(cache) => {
                        cache.purge_expired();
                    }
                    None => break,
                }
            }
            debug!("MemCache sweeper stopped");
        })
    }
}

impl Default for MemCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemCache {
    /// # Summary
    /// 写入原始字节，记录写入时间。若存在同名 Key 则整体覆盖。
    async fn set_raw(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let slot = Slot {
            stored_at: self.clock.now(),
            bytes: value,
        };
        self.storage.insert(key.to_string(), slot);
        Ok(())
    }

    /// # Summary
    /// 获取原始字节数据。
    ///
    /// # Logic
    /// 1. 命中且未超过保留期，克隆字节返回。
    /// 2. 命中但已超过保留期，惰性淘汰并返回 None。
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = self.clock.now();
        let removed = self
            .storage
            .remove_if(key, |_, slot| self.is_evictable(slot, now));
        if removed.is_some() {
            debug!("MemCache evicted {} on read", key);
            return Ok(None);
        }
        Ok(self.storage.get(key).map(|slot| slot.bytes.clone()))
    }

    /// # Summary
    /// 删除指定键，无论键是否存在均返回 Ok。
    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.storage.remove(key);
        Ok(())
    }
}

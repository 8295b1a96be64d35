//! # 测试替身
//!
//! 供下游 crate 的集成测试使用的上游与缓存替身，通过 `test-utils` feature 启用。

use crate::cache::error::CacheError;
use crate::cache::port::Cache;
use crate::price::error::UpstreamError;
use crate::price::port::UpstreamFeed;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

/// # Summary
/// 按脚本依次返回结果的上游替身，并记录调用次数。
///
/// # Invariants
/// - 脚本耗尽后重复返回最后一个结果。
pub struct ScriptedFeed {
    script: Mutex<VecDeque<Result<Value, UpstreamError>>>,
    last: Mutex<Option<Result<Value, UpstreamError>>>,
    calls: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new(script: Vec<Result<Value, UpstreamError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// 始终返回同一结果
    pub fn always(result: Result<Value, UpstreamError>) -> Self {
        Self::new(vec![result])
    }

    /// 已被调用的次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamFeed for ScriptedFeed {
    async fn fetch_upstream(&self) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match next {
            Some(result) => {
                *last = Some(result.clone());
                result
            }
            None => last.clone().unwrap_or_else(|| {
                Err(UpstreamError::Unreachable {
                    attempts: 0,
                    last_error: "empty script".to_string(),
                })
            }),
        }
    }
}

/// # Summary
/// 写入会被闸门挡住的缓存替身，用于验证写入与响应解耦。
///
/// # Logic
/// 1. `set_raw` 先等待一个闸门许可，拿到许可后才真正落盘。
/// 2. 测试通过 `release_writes` 放行指定数量的写入。
pub struct GatedCache {
    storage: DashMap<String, Vec<u8>>,
    gate: Semaphore,
    writes: AtomicUsize,
}

impl GatedCache {
    pub fn new() -> Self {
        Self {
            storage: DashMap::new(),
            gate: Semaphore::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// 放行 `n` 次写入
    pub fn release_writes(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// 已完成落盘的写入次数
    pub fn completed_writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Default for GatedCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for GatedCache {
    async fn set_raw(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;
        permit.forget();
        self.storage.insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.storage.get(key).map(|v| v.value().clone()))
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.storage.remove(key);
        Ok(())
    }
}

/// # Summary
/// 所有操作都失败的缓存替身，模拟底座不可用。
pub struct BrokenCache;

#[async_trait]
impl Cache for BrokenCache {
    async fn set_raw(&self, _key: &str, _value: Vec<u8>) -> Result<(), CacheError> {
        Err(CacheError::Storage("cache substrate offline".to_string()))
    }

    async fn get_raw(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::Storage("cache substrate offline".to_string()))
    }

    async fn del(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Storage("cache substrate offline".to_string()))
    }
}

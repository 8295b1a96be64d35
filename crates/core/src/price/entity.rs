use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// 单个品种的金价记录。
///
/// # Invariants
/// - 四个价格字段均为非负数。
/// - `min_price <= max_price`。
/// - 价格统一以 `Decimal` 表示，不保留上游的文本形态。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    // 品种稳定标识
    pub id: String,
    // 品种分类 (上游字段 `dir`)
    pub category: String,
    // 品种名称，例如 "Au999"
    pub title: String,
    // 涨跌幅文本，保留符号前缀，例如 "+1.2"
    pub change_percent: String,
    // 当日最高价
    pub max_price: Decimal,
    // 当日最低价
    pub min_price: Decimal,
    // 买入价
    pub buy_price: Decimal,
    // 回收价
    pub recycle_price: Decimal,
    // 报价日期
    pub date: String,
}

/// # Summary
/// 上游在某一时刻返回的完整金价快照。
///
/// # Invariants
/// - 健康快照的 `status_code` 为 200，且 `quotes` 非空。
/// - `quotes` 保持上游给出的顺序。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub status_code: u16,
    pub message: String,
    // 上游报告的数据时间
    pub fetched_at: String,
    // 头条价格文本，例如 "¥500"
    pub headline_price: String,
    pub quotes: Vec<PriceQuote>,
}

/// # Summary
/// 缓存条目：快照加写入时间与新鲜度窗口。
///
/// # Invariants
/// - 写入后只读，后续成功抓取只会整体替换，不做合并。
/// - 超过新鲜度窗口后仍可作为陈旧数据读取，直到底座物理淘汰。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub snapshot: PriceSnapshot,
    pub stored_at: DateTime<Utc>,
    pub max_age_secs: u64,
}

impl CacheEntry {
    /// 以指定写入时间与新鲜度窗口封装快照
    pub fn new(snapshot: PriceSnapshot, stored_at: DateTime<Utc>, max_age_secs: u64) -> Self {
        Self {
            snapshot,
            stored_at,
            max_age_secs,
        }
    }

    /// # Summary
    /// 计算条目的过期时刻。
    ///
    /// # Logic
    /// 1. 将秒数转换为 `TimeDelta`，超出范围时视为永不过期。
    pub fn expires_at(&self) -> DateTime<Utc> {
        i64::try_from(self.max_age_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|window| self.stored_at.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// 判断条目在 `now` 时刻是否仍在新鲜度窗口内
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }
}

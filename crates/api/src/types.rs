//! # DTO (Data Transfer Object) 层
//!
//! 将内部快照转化为对外 JSON 契约。字段名与上游保持一致 (`code`、`msg`、`data` ...)，
//! 下游看板只依赖此处定义的结构。
//! 所有 DTO 必须派生 `utoipa::ToSchema` 以自动进入 OpenAPI 文档。

use aurum_core::price::entity::{PriceQuote, PriceSnapshot};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 陈旧兜底时覆盖 `msg` 的提示文本
pub const STALE_MESSAGE: &str = "显示缓存数据 (API暂时不可用)";

/// 硬失败时的 `msg`
pub const FAILURE_MESSAGE: &str = "Failed to fetch gold price";

// ============================================================
//  金价相关 DTO
// ============================================================

/// 单个品种报价 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuoteResponse {
    /// 品种标识
    #[schema(example = "1")]
    pub id: String,
    /// 品种分类
    #[schema(example = "A")]
    pub dir: String,
    /// 品种名称
    #[schema(example = "Au999")]
    pub title: String,
    /// 涨跌幅 (带符号前缀)
    #[schema(example = "+1.2")]
    pub changepercent: String,
    /// 最高价
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 510)]
    pub maxprice: Decimal,
    /// 最低价
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 495)]
    pub minprice: Decimal,
    /// 买入价
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 500)]
    pub buyprice: Decimal,
    /// 回收价
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 490)]
    pub recycleprice: Decimal,
    /// 报价日期
    #[schema(example = "2024-01-01")]
    pub date: String,
}

/// 金价快照响应 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GoldPriceResponse {
    /// 上游状态码 (陈旧兜底时保留缓存中的值)
    #[schema(example = 200)]
    pub code: u16,
    /// 提示信息
    #[schema(example = "ok")]
    pub msg: String,
    /// 上游数据时间
    #[schema(example = "2024-01-01 10:00")]
    pub time: String,
    /// 头条价格
    #[schema(example = "¥500")]
    pub price: String,
    /// 报价列表，保持上游顺序
    pub data: Vec<QuoteResponse>,
    /// 仅在陈旧兜底时出现，值固定为 true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale: Option<bool>,
}

impl GoldPriceResponse {
    /// 构建陈旧兜底响应：保留 `code`，覆盖 `msg`，打上 `stale` 标记
    pub fn stale(snapshot: PriceSnapshot) -> Self {
        Self {
            msg: STALE_MESSAGE.to_string(),
            stale: Some(true),
            ..Self::from(snapshot)
        }
    }
}

/// 硬失败响应 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FailureResponse {
    /// 固定为 500
    #[schema(example = 500)]
    pub code: u16,
    /// 固定为 "Failed to fetch gold price"
    #[schema(example = "Failed to fetch gold price")]
    pub msg: String,
    /// 失败原因摘要
    #[schema(example = "HTTP error! status: 502")]
    pub error: String,
    /// 提示客户端可稍后重试，固定为 true
    #[schema(example = true)]
    pub retryable: bool,
}

impl FailureResponse {
    /// 从错误摘要构建
    pub fn from_error(error: impl Into<String>) -> Self {
        Self {
            code: 500,
            msg: FAILURE_MESSAGE.to_string(),
            error: error.into(),
            retryable: true,
        }
    }
}

// ============================================================
//  领域模型 → DTO 惯用转换 (impl From<T>)
// ============================================================

impl From<PriceQuote> for QuoteResponse {
    fn from(q: PriceQuote) -> Self {
        Self {
            id: q.id,
            dir: q.category,
            title: q.title,
            changepercent: q.change_percent,
            maxprice: q.max_price,
            minprice: q.min_price,
            buyprice: q.buy_price,
            recycleprice: q.recycle_price,
            date: q.date,
        }
    }
}

impl From<PriceSnapshot> for GoldPriceResponse {
    fn from(s: PriceSnapshot) -> Self {
        Self {
            code: s.status_code,
            msg: s.message,
            time: s.fetched_at,
            price: s.headline_price,
            data: s.quotes.into_iter().map(Into::into).collect(),
            stale: None,
        }
    }
}

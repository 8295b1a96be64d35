use thiserror::Error;

/// # Summary
/// 上游调用错误枚举。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 只有 `Unreachable` 经历过重试；`HttpStatus` 与 `Body` 均在首次收到响应后立即返回。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    // 网络故障或超时，已耗尽全部重试次数
    #[error("upstream unreachable after {attempts} attempts: {last_error}")]
    Unreachable { attempts: u32, last_error: String },
    // 收到了响应，但状态码不是 2xx
    #[error("HTTP error! status: {0}")]
    HttpStatus(u16),
    // 2xx 响应体无法读取或不是合法 JSON
    #[error("unreadable upstream body: {0}")]
    Body(String),
}

/// # Summary
/// 上游载荷校验错误枚举，由规范化器产生。
///
/// # Invariants
/// - 任一变体都意味着整个快照被拒绝，不会写入缓存。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    // 载荷不是 JSON 对象
    #[error("Invalid API response format: payload is not an object")]
    NotAnObject,
    // `code` 缺失或不等于 200
    #[error("Invalid API response format: unhealthy status code {0}")]
    UnhealthyStatus(String),
    // `data` 字段缺失
    #[error("Invalid API response format: missing data")]
    MissingData,
    // `data` 字段不是数组
    #[error("Invalid API response format: data is not an array")]
    DataNotArray,
    // 健康快照必须至少包含一条报价
    #[error("Invalid API response format: data is empty")]
    EmptyQuotes,
    // 单条报价的某个字段不合法
    #[error("Invalid quote at index {index}: field `{field}` {reason}")]
    MalformedQuote {
        index: usize,
        field: &'static str,
        reason: String,
    },
}

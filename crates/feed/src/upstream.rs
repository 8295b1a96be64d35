use crate::retry::RetryConfig;
use async_trait::async_trait;
use aurum_core::config::UpstreamConfig;
use aurum_core::price::error::UpstreamError;
use aurum_core::price::port::UpstreamFeed;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// # Summary
/// 第三方金价接口客户端。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯，每次尝试都有独立的超时计时。
/// - 仅对网络故障与超时重试；收到任何 HTTP 响应后不再重试。
/// - 调用之间不保存任何状态。
#[derive(Clone)]
pub struct GoldPriceClient {
    /// 内部使用的 HTTP 客户端
    client: Client,
    /// 上游接口地址
    url: String,
    retry: RetryConfig,
}

impl GoldPriceClient {
    /// # Summary
    /// 根据上游配置创建客户端。
    ///
    /// # Logic
    /// 1. 按配置设置单次请求超时。
    /// 2. 设置浏览器 User-Agent 以减少被拦截风险。
    /// 3. 从配置派生重试策略。
    ///
    /// # Returns
    /// 成功返回客户端，TLS 或连接池初始化失败时返回 `reqwest::Error`。
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        Self::with_retry(
            &config.url,
            Duration::from_secs(config.timeout_secs),
            RetryConfig::from(config),
        )
    }

    /// # Summary
    /// 使用显式的地址、超时与重试策略创建客户端。
    pub fn with_retry(
        url: &str,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
            ),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
            retry,
        })
    }

    /// 上游接口地址
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl UpstreamFeed for GoldPriceClient {
    /// # Summary
    /// 抓取上游金价原始载荷。
    ///
    /// # Logic
    /// 1. 发起 GET 请求；网络故障或超时则按指数退避等待后整体重试。
    /// 2. 尝试次数耗尽后返回 `Unreachable`。
    /// 3. 收到非 2xx 响应立即返回 `HttpStatus`，不重试。
    /// 4. 2xx 响应体解析为 JSON，失败返回 `Body`。
    async fn fetch_upstream(&self) -> Result<Value, UpstreamError> {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            debug!(attempt, url = %self.url, "requesting upstream gold price");

            let failure = match self.client.get(&self.url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if !status.is_success() {
                        warn!(attempt, status = status.as_u16(), "upstream returned non-success status");
                        return Err(UpstreamError::HttpStatus(status.as_u16()));
                    }
                    // 读取响应体超时同样计为一次失败尝试
                    match resp.bytes().await {
                        Ok(body) => {
                            return serde_json::from_slice::<Value>(&body).map_err(|e| {
                                warn!(error = %e, "upstream body is not valid JSON");
                                UpstreamError::Body(e.to_string())
                            });
                        }
                        Err(e) => e,
                    }
                }
                Err(e) => e,
            };

            warn!(
                attempt,
                max_attempts = self.retry.max_attempts,
                timeout = failure.is_timeout(),
                error = %failure,
                "upstream request failed"
            );
            if attempt >= self.retry.max_attempts {
                return Err(UpstreamError::Unreachable {
                    attempts: attempt,
                    last_error: failure.to_string(),
                });
            }
            let delay = self.retry.delay_for_retry(attempt.saturating_sub(1));
            tokio::time::sleep(delay).await;
        }
    }
}

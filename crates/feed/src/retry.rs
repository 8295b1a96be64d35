//! 上游请求的重试退避策略。

use aurum_core::config::UpstreamConfig;
use std::time::Duration;

/// # Summary
/// 指数退避重试配置。
///
/// # Invariants
/// - `max_attempts` 包含首次请求，至少为 1。
/// - 第 n 次重试前的等待时间为 `initial_delay * backoff_factor^n`，并以 `max_delay` 封顶。
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2,
        }
    }
}

impl From<&UpstreamConfig> for RetryConfig {
    fn from(cfg: &UpstreamConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            initial_delay: Duration::from_millis(cfg.backoff_base_ms),
            backoff_factor: cfg.backoff_factor,
            ..Self::default()
        }
    }
}

impl RetryConfig {
    /// # Summary
    /// 计算第 `retry` 次重试 (0 起) 之前的等待时间。
    ///
    /// # Logic
    /// 1. 计算 `backoff_factor^retry`，溢出时直接取上限。
    /// 2. 与初始延迟相乘后以 `max_delay` 封顶。
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.backoff_factor
            .checked_pow(retry)
            .and_then(|multiplier| self.initial_delay.checked_mul(multiplier))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

use serde::{Deserialize, Serialize};

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 上游金价接口及重试策略
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub url: String,
    // 单次尝试的超时时间，每次重试都会重新计时
    pub timeout_secs: u64,
    // 总尝试次数上限 (含首次请求)
    pub max_attempts: u32,
    // 第一次重试前的等待时间
    pub backoff_base_ms: u64,
    pub backoff_factor: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    // 新鲜度窗口，同时写入 `Cache-Control: max-age`
    pub max_age_secs: u64,
    // 条目超过该年龄后由内存底座物理淘汰
    pub retention_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8787,
            },
            upstream: UpstreamConfig {
                url: "https://api.pearktrue.cn/api/goldprice/".to_string(),
                timeout_secs: 10,
                max_attempts: 3,
                backoff_base_ms: 1000,
                backoff_factor: 2,
            },
            cache: CacheConfig {
                max_age_secs: 300,
                retention_secs: 86400,
                sweep_interval_secs: 600,
            },
        }
    }
}

impl ServerConfig {
    /// 拼接监听地址，例如 `"0.0.0.0:8787"`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

//! # `aurum-core` - 领域核心
//!
//! 定义金价代理的实体、端口 (Trait) 与领域错误。
//! 本 crate 不包含任何 I/O 实现，具体实现由 `aurum-cache`、`aurum-feed` 等下游 crate 提供。

pub mod cache;
pub mod common;
pub mod config;
pub mod price;

#[cfg(feature = "test-utils")]
pub mod test_utils;

/// # Summary
/// 安装进程级 rustls 加密后端 (ring)。
///
/// # Logic
/// 1. `reqwest` 以 `rustls-no-provider` 方式编译，构建 HTTP 客户端前必须先安装后端。
/// 2. 重复安装视为成功，可在测试中多次调用。
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }
}

//! # `aurum-proxy` - 缓存代理编排层
//!
//! 组合缓存底座、上游客户端与规范化器，为每个请求决定走哪条路径：
//! 新鲜命中、回源刷新、陈旧兜底或硬失败。本 crate 不关心 HTTP 细节，
//! 状态码与响应头的映射由 `aurum-api` 完成。

pub mod orchestrator;

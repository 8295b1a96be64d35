//! # `aurum-api` - HTTP 层
//!
//! 本 crate 是金价边缘缓存代理的 HTTP 服务入口。
//! 使用 `axum` 构建路由，通过 `utoipa` 从代码生成 OpenAPI 3.0 文档。
//!
//! ## 架构职责
//! - 仅暴露 `GET /api/goldprice`，其余路径一律 404 空响应体
//! - 调用 `aurum-proxy` 的编排服务得到终态
//! - 将终态映射为状态码、响应头 (`Cache-Control` / `Warning`) 与 JSON 契约

pub mod error;
pub mod routes;
pub mod server;
pub mod types;

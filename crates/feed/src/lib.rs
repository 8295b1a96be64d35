//! # `aurum-feed` - 上游接入层
//!
//! - `upstream`: 带超时与指数退避重试的金价接口客户端
//! - `retry`: 重试退避策略
//! - `normalize`: 将上游原始 JSON 校验并规整为内部快照结构

pub mod normalize;
pub mod retry;
pub mod upstream;

//! # `aurum-cache` - 缓存底座实现
//!
//! 提供 `aurum_core::cache::port::Cache` 的内存实现，支持按保留期物理淘汰。

pub mod mem;

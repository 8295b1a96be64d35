mod settings;

use std::sync::Arc;
use std::time::Duration;

use aurum_api::server::{AppState, openapi_document, start_server};
use aurum_cache::mem::MemCache;
use aurum_core::common::time::RealTimeProvider;
use aurum_feed::upstream::GoldPriceClient;
use aurum_proxy::orchestrator::GoldPriceService;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// # Summary
/// 应用启动入口，纯粹的组装容器。
/// 负责实例化上游客户端与缓存底座，并通过 Arc<dyn Trait> 注入到 GoldPriceService。
///
/// # Logic
/// 1. 初始化全局日志。
/// 2. 加载分层配置。
/// 3. 实例化基础设施层（上游客户端、内存缓存及其清理任务）。
/// 4. 构造应用服务层（GoldPriceService）。
/// 5. 启动 HTTP 服务，收到 Ctrl-C 后优雅退出。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::args().any(|arg| arg == "--print-openapi") {
        println!("{}", openapi_document().to_pretty_json()?);
        return Ok(());
    }

    // 1. 初始化日志，guard 需存活到进程结束以刷出缓冲
    let _log_guard = init_logging();
    aurum_core::install_crypto_provider();
    info!("Aurum gold price proxy starting...");

    // 2. 加载配置
    let config = settings::load()?;
    info!(max_age_secs = config.cache.max_age_secs, "configuration loaded");

    // 3. 实例化基础设施层
    let feed = Arc::new(GoldPriceClient::new(&config.upstream)?);
    info!(upstream = %feed.url(), "upstream client ready");
    let cache = Arc::new(MemCache::with_retention(
        Duration::from_secs(config.cache.retention_secs),
        Arc::new(RealTimeProvider),
    ));
    let sweeper = cache.spawn_sweeper(Duration::from_secs(config.cache.sweep_interval_secs));

    // 4. 构造应用服务层
    let gold_price = GoldPriceService::new(
        feed,
        cache,
        Arc::new(RealTimeProvider),
        config.cache.max_age_secs,
    );

    // 5. 启动服务并挂起，直到收到退出信号
    let state = AppState { gold_price };
    start_server(state, &config.server.bind_addr(), shutdown_signal()).await?;

    sweeper.abort();
    info!("Shutdown complete. Exiting...");
    Ok(())
}

/// 控制台日志：遵循 `RUST_LOG`，默认 info；经后台线程非阻塞写出
fn init_logging() -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(writer)
        .init();
    guard
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            // 无法监听信号时保持运行，交由进程管理器终止
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

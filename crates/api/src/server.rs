//! # API 服务启动器
//!
//! 组装 axum 路由、配置 CORS 与请求追踪并绑定 TCP 端口对外提供服务。
//! 本模块不直接启动 `main()`, 而是由 `crates/app` 组装依赖后调用。

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::http::Method;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use aurum_proxy::orchestrator::GoldPriceService;

use crate::routes::goldprice;

// ============================================================
//  共享应用状态
// ============================================================

/// 全局应用状态，通过 axum 的 `State` 提取器注入到 Handler 中。
///
/// # Invariants
/// - `gold_price` 在服务启动前注入，生命周期与进程等同。
#[derive(Clone)]
pub struct AppState {
    /// 金价缓存代理服务
    pub gold_price: Arc<GoldPriceService>,
}

// ============================================================
//  OpenAPI 文档定义
// ============================================================

/// 全局 OpenAPI 文档结构
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Aurum 金价缓存代理 API",
        version = "0.1.0",
        description = "金价数据的边缘缓存代理。新鲜窗口内直接返回缓存，过期后回源刷新，上游故障时以旧数据兜底。",
        license(name = "MIT")
    ),
    tags(
        (name = "金价 (Gold)", description = "金价快照查询")
    )
)]
pub struct ApiDoc;

// ============================================================
//  服务构建与启动
// ============================================================

/// 构建路由树，同时返回收集到的 OpenAPI 文档。
///
/// `/api/goldprice` 接受任意方法 (文档只描述 GET)；其余路径一律返回 404 空响应体。
pub fn build_router(state: AppState) -> (Router, utoipa::openapi::OpenApi) {
    let (router, api) = OpenApiRouter::<AppState>::with_openapi(ApiDoc::openapi())
        .routes(routes!(goldprice::get_gold_price))
        .split_for_parts();

    // 只读接口，跨域仅放行 GET
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    let app = router
        .method_not_allowed_fallback(goldprice::get_gold_price)
        .fallback(goldprice::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    (app, api)
}

/// 仅生成 OpenAPI 文档，不需要运行时状态
pub fn openapi_document() -> utoipa::openapi::OpenApi {
    let (_, api) = OpenApiRouter::<AppState>::with_openapi(ApiDoc::openapi())
        .routes(routes!(goldprice::get_gold_price))
        .split_for_parts();
    api
}

/// 在已绑定的监听器上提供服务，`shutdown` 完成后优雅退出。
pub async fn serve_on<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (app, _) = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// 绑定端口并启动 HTTP 监听。
///
/// # Arguments
/// * `state` - 由外部注入的共享状态
/// * `bind_addr` - 监听的地址与端口，如 `"0.0.0.0:8787"`
/// * `shutdown` - 关闭信号，完成后停止接收新连接
pub async fn start_server<F>(
    state: AppState,
    bind_addr: &str,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("🚀 Aurum gold price proxy listening on {}", bind_addr);
    serve_on(listener, state, shutdown).await?;
    tracing::info!("Aurum gold price proxy stopped");
    Ok(())
}

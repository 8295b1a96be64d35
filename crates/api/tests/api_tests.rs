use aurum_api::server::{AppState, build_router, openapi_document, serve_on};
use aurum_api::types::{FailureResponse, GoldPriceResponse, STALE_MESSAGE};
use aurum_cache::mem::MemCache;
use aurum_core::cache::port::EntryCacheExt;
use aurum_core::common::time::FakeClockProvider;
use aurum_core::price::entity::{CacheEntry, PriceQuote, PriceSnapshot};
use aurum_core::price::error::UpstreamError;
use aurum_core::test_utils::ScriptedFeed;
use aurum_proxy::orchestrator::{GoldPriceService, cache_key};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceExt;

const MAX_AGE: u64 = 300;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
}

fn sample_payload() -> Value {
    json!({
        "code": 200,
        "msg": "ok",
        "time": "2024-01-01 10:00",
        "price": "¥500",
        "data": [{
            "id": "1", "dir": "A", "title": "Au999", "changepercent": "+1.2",
            "maxprice": "510", "minprice": "495", "buyprice": "500",
            "recycleprice": "490", "date": "2024-01-01"
        }]
    })
}

struct TestApp {
    router: Router,
    feed: Arc<ScriptedFeed>,
    cache: Arc<MemCache>,
    clock: Arc<FakeClockProvider>,
    state: AppState,
}

fn test_app(feed: ScriptedFeed) -> TestApp {
    let feed = Arc::new(feed);
    let cache = Arc::new(MemCache::new());
    let clock = Arc::new(FakeClockProvider::new(t0()));
    let gold_price = GoldPriceService::new(feed.clone(), cache.clone(), clock.clone(), MAX_AGE);
    let state = AppState { gold_price };
    let (router, _) = build_router(state.clone());
    TestApp {
        router,
        feed,
        cache,
        clock,
        state,
    }
}

async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, header::HeaderMap, Vec<u8>) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

/// 等待后台缓存写入落地
async fn wait_for_entry(cache: &MemCache, key: &str) -> CacheEntry {
    for _ in 0..100 {
        if let Some(entry) = cache.get_entry(key).await.unwrap() {
            return entry;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("cache entry for {} was never written", key);
}

#[tokio::test]
async fn test_fresh_fetch_returns_normalized_snapshot() {
    let app = test_app(ScriptedFeed::always(Ok(sample_payload())));

    let (status, headers, body) = send(&app.router, "GET", "/api/goldprice").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=300"
    );
    assert!(headers.get(header::WARNING).is_none());

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["code"], 200);
    assert_eq!(json["msg"], "ok");
    assert_eq!(json["data"][0]["maxprice"].as_f64(), Some(510.0));
    assert_eq!(json["data"][0]["changepercent"], "+1.2");
    assert!(json.get("stale").is_none());

    let parsed: GoldPriceResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed.data[0].buyprice, dec!(500));
}

#[tokio::test]
async fn test_second_request_within_window_is_byte_identical() {
    let app = test_app(ScriptedFeed::always(Ok(sample_payload())));

    let (_, _, first) = send(&app.router, "GET", "/api/goldprice").await;
    wait_for_entry(&app.cache, &cache_key("GET", "/api/goldprice")).await;

    app.clock.advance(TimeDelta::seconds(120));
    let (status, _, second) = send(&app.router, "GET", "/api/goldprice").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.feed.calls(), 1);
    let first: Value = serde_json::from_slice(&first).unwrap();
    let second: Value = serde_json::from_slice(&second).unwrap();
    assert_eq!(
        serde_json::to_vec(&first["data"]).unwrap(),
        serde_json::to_vec(&second["data"]).unwrap()
    );
}

#[tokio::test]
async fn test_upstream_outage_serves_stale_with_warning() {
    let app = test_app(ScriptedFeed::new(vec![
        Ok(sample_payload()),
        Err(UpstreamError::Unreachable {
            attempts: 3,
            last_error: "operation timed out".to_string(),
        }),
    ]));

    let (status, _, _) = send(&app.router, "GET", "/api/goldprice").await;
    assert_eq!(status, StatusCode::OK);
    wait_for_entry(&app.cache, &cache_key("GET", "/api/goldprice")).await;

    app.clock.advance(TimeDelta::hours(2));
    let (status, headers, body) = send(&app.router, "GET", "/api/goldprice").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(header::WARNING).unwrap(),
        "110 - Response is stale"
    );
    assert!(headers.get(header::CACHE_CONTROL).is_none());

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["stale"], true);
    assert_eq!(json["msg"], STALE_MESSAGE);
    assert_eq!(json["code"], 200);
    assert_eq!(json["data"][0]["maxprice"].as_f64(), Some(510.0));
    assert_eq!(app.feed.calls(), 2);
}

#[tokio::test]
async fn test_upstream_outage_without_cache_is_500() {
    let app = test_app(ScriptedFeed::always(Err(UpstreamError::HttpStatus(502))));

    let (status, _, body) = send(&app.router, "GET", "/api/goldprice").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let failure: FailureResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(failure.code, 500);
    assert_eq!(failure.msg, "Failed to fetch gold price");
    assert_eq!(failure.error, "HTTP error! status: 502");
    assert!(failure.retryable);
}

#[tokio::test]
async fn test_malformed_payload_without_cache_is_500() {
    let mut bad = sample_payload();
    bad["data"][0]["maxprice"] = json!("abc");
    let app = test_app(ScriptedFeed::always(Ok(bad)));

    let (status, _, body) = send(&app.router, "GET", "/api/goldprice").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["retryable"], true);
    tokio::task::yield_now().await;
    assert!(app.cache.is_empty());
}

#[tokio::test]
async fn test_unknown_path_is_empty_404() {
    let app = test_app(ScriptedFeed::always(Ok(sample_payload())));

    for uri in ["/", "/api", "/api/goldprice/extra", "/swagger-ui/"] {
        let (status, _, body) = send(&app.router, "GET", uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "path {}", uri);
        assert!(body.is_empty(), "path {}", uri);
    }
    let (status, _, body) = send(&app.router, "POST", "/api").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
    assert_eq!(app.feed.calls(), 0);
}

#[tokio::test]
async fn test_non_get_method_is_served_with_its_own_cache_key() {
    let app = test_app(ScriptedFeed::always(Ok(sample_payload())));

    let (status, headers, body) = send(&app.router, "POST", "/api/goldprice").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=300"
    );
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"][0]["maxprice"].as_f64(), Some(510.0));
    assert_eq!(app.feed.calls(), 1);

    // POST 的条目不会被 GET 读到
    wait_for_entry(&app.cache, &cache_key("POST", "/api/goldprice")).await;
    assert!(
        app.cache
            .get_entry(&cache_key("GET", "/api/goldprice"))
            .await
            .unwrap()
            .is_none()
    );
    let (status, _, _) = send(&app.router, "GET", "/api/goldprice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.feed.calls(), 2);
}

#[tokio::test]
async fn test_query_string_is_part_of_cache_key() {
    let app = test_app(ScriptedFeed::always(Ok(sample_payload())));
    let stored = CacheEntry::new(cached_snapshot(), t0(), MAX_AGE);
    app.cache
        .put_entry(&cache_key("GET", "/api/goldprice?v=2"), &stored)
        .await
        .unwrap();

    let (status, _, body) = send(&app.router, "GET", "/api/goldprice?v=2").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["price"], "¥480");
    assert_eq!(app.feed.calls(), 0);

    // 不同查询串未命中，需要回源
    let (_, _, body) = send(&app.router, "GET", "/api/goldprice").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["price"], "¥500");
    assert_eq!(app.feed.calls(), 1);
}

/// 直接构造一份缓存快照
fn cached_snapshot() -> PriceSnapshot {
    PriceSnapshot {
        status_code: 200,
        message: "ok".to_string(),
        fetched_at: "2024-01-01 09:00".to_string(),
        headline_price: "¥480".to_string(),
        quotes: vec![PriceQuote {
            id: "1".to_string(),
            category: "A".to_string(),
            title: "Au999".to_string(),
            change_percent: "-0.5".to_string(),
            max_price: dec!(485),
            min_price: dec!(470),
            buy_price: dec!(480),
            recycle_price: dec!(475),
            date: "2024-01-01".to_string(),
        }],
    }
}

#[tokio::test]
async fn test_openapi_document_lists_gold_price_route() {
    let doc = openapi_document();
    let json = serde_json::to_value(&doc).unwrap();

    assert!(json["paths"]["/api/goldprice"]["get"].is_object());
    assert!(json["paths"]["/api/goldprice"]["post"].is_null());
    assert!(json["components"]["schemas"]["GoldPriceResponse"].is_object());
}

#[tokio::test]
async fn test_real_server_round_trip() {
    aurum_core::install_crypto_provider();
    let app = test_app(ScriptedFeed::always(Ok(sample_payload())));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(serve_on(listener, app.state.clone(), async move {
        stop_rx.await.unwrap_or(());
    }));

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/api/goldprice", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=300"
    );
    let body: GoldPriceResponse = response.json().await.unwrap();
    assert_eq!(body.data.len(), 1);
    assert_eq!(body.data[0].title, "Au999");

    let missing = client
        .get(format!("http://{}/nope", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}

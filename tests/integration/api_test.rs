//! REST API integration tests

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, DurationRound, Utc};
use market_dash::ai::SummaryService;
use market_dash::api::{router, AppState};
use market_dash::config::Config;
use market_dash::kline::Bar;
use market_dash::storage::Store;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn seeded_store(symbol: &str, n: usize, base: f64) -> Store {
    let store = Store::open_in_memory().unwrap();
    seed(&store, symbol, n, base);
    store
}

fn seed(store: &Store, symbol: &str, n: usize, base: f64) {
    let now = Utc::now().duration_trunc(Duration::minutes(5)).unwrap();
    for i in 0..n {
        let start = now - Duration::minutes(5 * (n - i) as i64);
        let close = base * (1.0 + 0.001 * ((i as f64) * 0.9).sin());
        store
            .upsert_bar(&Bar {
                symbol: symbol.to_string(),
                start,
                open: close,
                high: close * 1.0005,
                low: close * 0.9995,
                close,
                ticks: 60,
                timestamp: start + Duration::seconds(295),
            })
            .unwrap();
    }
}

fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.ai.usage_file = dir.path().join("usage.json");
    config.ai.api_key_env = "MARKET_DASH_TEST_NO_KEY".to_string();
    config
}

fn app_with(store: Store, config: &Config) -> Router {
    let summaries = Arc::new(SummaryService::new(&config.ai, store.clone(), None));
    router(AppState::new(config, store, summaries))
}

fn app(store: Store, dir: &TempDir) -> Router {
    app_with(store, &test_config(dir))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get(app(Store::open_in_memory().unwrap(), &dir), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_price_latest_and_symbol_normalisation() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store("GBPUSD", 10, 1.27);
    let expected = store.latest_bar("GBPUSD").unwrap().unwrap();

    let (status, body) = get(app(store.clone(), &dir), "/price?symbol=%20GBPUSD%20").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "GBPUSD");
    assert_eq!(body["price"].as_f64().unwrap(), expected.close);

    // Provider ticker and lowercase resolve to the same symbol
    let (_, body) = get(app(store.clone(), &dir), "/price?symbol=GBPUSD=X").await;
    assert_eq!(body["symbol"], "GBPUSD");
    let (_, body) = get(app(store.clone(), &dir), "/price?symbol=gbpusd").await;
    assert_eq!(body["symbol"], "GBPUSD");

    // Default symbol
    let (status, body) = get(app(store, &dir), "/price").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "GBPUSD");
}

#[tokio::test]
async fn test_price_not_found() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get(app(Store::open_in_memory().unwrap(), &dir), "/price?symbol=EURUSD").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No data found");
}

#[tokio::test]
async fn test_history_limit_and_order() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store("EURUSD", 50, 1.05);

    let (status, body) = get(app(store.clone(), &dir), "/history?symbol=EURUSD&limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 10);
    let data = body["data"].as_array().unwrap();
    let first = data[0]["timestamp"].as_str().unwrap();
    let last = data[9]["timestamp"].as_str().unwrap();
    assert!(first < last);

    // limit=0 is clamped to 1
    let (_, body) = get(app(store, &dir), "/history?symbol=EURUSD&limit=0").await;
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_limit_clamped_to_max() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store("EURUSD", 50, 1.05);
    let mut config = test_config(&dir);
    config.api.max_limit = 20;

    let (status, body) =
        get(app_with(store.clone(), &config), "/history?symbol=EURUSD&limit=1000").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 20);

    let (_, body) = get(app_with(store, &config), "/klines?symbol=EURUSD&limit=1000").await;
    assert_eq!(body["bars"].as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn test_malformed_limit_is_json_error() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store("GBPUSD", 10, 1.27);

    for uri in ["/history?limit=abc", "/klines?limit=-1", "/risk?limit=1.5"] {
        let response = app(store.clone(), &dir)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/json"));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(!body["error"].as_str().unwrap().is_empty(), "{}", uri);
    }
}

#[tokio::test]
async fn test_klines_with_moving_averages() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store("GBPUSD", 30, 1.27);

    let (status, body) = get(app(store, &dir), "/klines?symbol=GBPUSD&limit=25").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["interval_secs"], 300);
    assert_eq!(body["bars"].as_array().unwrap().len(), 25);

    let ma5 = body["moving_averages"]["ma5"].as_array().unwrap();
    let ma20 = body["moving_averages"]["ma20"].as_array().unwrap();
    assert_eq!(ma5.len(), 25);
    assert!(ma5[3].is_null());
    assert!(ma5[4].is_number());
    assert!(ma20[18].is_null());
    assert!(ma20[19].is_number());

    let ema12 = body["moving_averages"]["ema12"].as_array().unwrap();
    assert_eq!(ema12.len(), 25);
    assert!(ema12[10].is_null());
    assert!(ema12[11].is_number());
}

#[tokio::test]
async fn test_risk_report() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store("BTCUSD", 100, 95_000.0);

    let (status, body) = get(app(store, &dir), "/risk?symbol=BTCUSD").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "BTCUSD");
    assert_eq!(body["status"], "OK");
    assert_eq!(body["summary"]["data_points"], 100);
    assert!(body["summary"]["risk_score"].as_u64().unwrap() <= 100);
    assert!(body["signals"].is_array());
}

#[tokio::test]
async fn test_risk_insufficient_data() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store("GBPUSD", 1, 1.27);

    let (status, body) = get(app(store, &dir), "/risk").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "INSUFFICIENT_DATA");
    assert_eq!(body["data_points"], 1);
    assert_eq!(body["required_points"], 20);
}

#[tokio::test]
async fn test_summary_unavailable_without_key() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store("GBPUSD", 30, 1.27);

    let (status, body) = get(app(store, &dir), "/summary?symbol=GBPUSD").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("MARKET_DASH_TEST_NO_KEY"));
}

#[tokio::test]
async fn test_symbols_listing() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store("GBPUSD", 12, 1.27);
    seed(&store, "BTCUSD", 3, 95_000.0);

    let (status, body) = get(app(store, &dir), "/symbols").await;
    assert_eq!(status, StatusCode::OK);
    let symbols = body["symbols"].as_array().unwrap();
    assert_eq!(symbols.len(), 2);
    assert_eq!(symbols[0]["symbol"], "BTCUSD");
    assert_eq!(symbols[0]["bars"], 3);
    assert_eq!(symbols[1]["bars"], 12);
}

#[tokio::test]
async fn test_dashboard_served() {
    let dir = TempDir::new().unwrap();
    let response = app(Store::open_in_memory().unwrap(), &dir)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("/klines"));
    assert!(html.contains("candlestick"));
    assert!(html.contains("encodeURIComponent"));
}

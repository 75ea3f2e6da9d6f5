//! End-to-end integration tests

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use market_dash::ai::{AiError, LlmClient, SummaryService};
use market_dash::api::{router, AppState};
use market_dash::config::{Config, FeedProvider, LogFormat};
use market_dash::feed::{HistoryInterval, PriceValidator, SimulatedFeed};
use market_dash::kline::{fill_history, KlineCollector};
use market_dash::storage::Store;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct CannedLlm {
    calls: AtomicUsize,
}

#[async_trait]
impl LlmClient for CannedLlm {
    fn model(&self) -> &str {
        "canned"
    }

    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("Sterling consolidated in a tight range.".to_string())
    }
}

#[test]
fn test_config_example_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example");
    let config = Config::load(path).unwrap();

    assert_eq!(config.collector.symbols, vec!["GBPUSD", "EURUSD", "BTCUSD"]);
    assert_eq!(config.collector.bar_interval_secs, 300);
    assert_eq!(config.feed.provider, FeedProvider::Yahoo);
    assert_eq!(config.feed.tickers["BTCUSD"], "BTC-USD");
    assert_eq!(config.risk.volatility_window, 20);
    assert_eq!(config.ai.max_calls_per_day, 20);
    assert_eq!(config.api.port, 5000);
    assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
    assert!(config.telemetry.metrics_port.is_none());
}

#[test]
fn test_empty_config_uses_defaults() {
    let config: Config = toml::from_str("").unwrap();
    tokio_test::assert_ok!(config.validate());
    assert_eq!(config.api.default_symbol, "GBPUSD");
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_backfill_collect_and_serve() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage.db_path = dir.path().join("data").join("market.db");
    config.ai.usage_file = dir.path().join("data").join("ai_usage.json");
    config.feed.provider = FeedProvider::Simulated;
    config.collector.symbols = vec!["GBPUSD".to_string()];

    let store = Store::open(&config.storage.db_path).unwrap();
    let validator = PriceValidator::new(&config.validation);

    // Backfill
    let feed = Arc::new(SimulatedFeed::with_seed(5));
    let report = fill_history(
        &store,
        feed.as_ref(),
        &validator,
        "GBPUSD",
        HistoryInterval::FiveMinutes,
        120,
    )
    .await
    .unwrap();
    assert!(report.inserted >= 100);

    // A few live ticks on top, flushed as a partial bar
    let mut collector = KlineCollector::new(&config.collector, feed, store.clone(), validator);
    for _ in 0..3 {
        collector.tick_once(Utc::now()).await;
    }
    let (tx, rx) = tokio::sync::watch::channel(true);
    collector.run(rx).await.unwrap();
    drop(tx);

    // Serve
    let llm = Arc::new(CannedLlm {
        calls: AtomicUsize::new(0),
    });
    let summaries = Arc::new(SummaryService::new(
        &config.ai,
        store.clone(),
        Some(llm.clone() as Arc<dyn LlmClient>),
    ));
    let app = router(AppState::new(&config, store, summaries));

    let (status, price) = get_json(app.clone(), "/price?symbol=GBPUSD").await;
    assert_eq!(status, StatusCode::OK);
    assert!(price["price"].as_f64().unwrap() > 0.8);

    let (_, klines) = get_json(app.clone(), "/klines?symbol=GBPUSD&limit=60").await;
    assert_eq!(klines["bars"].as_array().unwrap().len(), 60);

    let (_, risk) = get_json(app.clone(), "/risk?symbol=GBPUSD").await;
    assert_eq!(risk["status"], "OK");

    let (status, summary) = get_json(app.clone(), "/summary?symbol=GBPUSD").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["model"], "canned");
    assert_eq!(summary["cached"], false);

    let (status, again) = get_json(app.clone(), "/summary?symbol=GBPUSD").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["cached"], true);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);

    // Backup of the live database
    let backup = dir.path().join("backups").join("copy.db");
    Store::open(&config.storage.db_path)
        .unwrap()
        .backup_to(&backup)
        .unwrap();
    let copy = Store::open(&backup).unwrap();
    assert!(copy.latest_bar("GBPUSD").unwrap().is_some());
}

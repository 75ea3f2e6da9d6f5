//! Collector integration tests

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use market_dash::config::{CollectorConfig, ValidationConfig};
use market_dash::feed::{
    FeedError, HistoryInterval, HistoryPoint, PriceFeed, PriceValidator, SimulatedFeed,
};
use market_dash::kline::{fill_history, FillSource, KlineCollector};
use market_dash::storage::Store;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

/// Feed that replays a fixed price path per symbol
struct PathFeed {
    paths: Mutex<HashMap<String, Vec<f64>>>,
}

impl PathFeed {
    fn new(paths: &[(&str, &[f64])]) -> Self {
        let paths = paths
            .iter()
            .map(|(s, p)| (s.to_string(), p.iter().rev().copied().collect()))
            .collect();
        Self {
            paths: Mutex::new(paths),
        }
    }
}

#[async_trait]
impl PriceFeed for PathFeed {
    async fn latest_price(&self, symbol: &str) -> Result<f64, FeedError> {
        self.paths
            .lock()
            .get_mut(symbol)
            .and_then(|p| p.pop())
            .ok_or_else(|| FeedError::NoData(symbol.to_string()))
    }

    async fn history(
        &self,
        symbol: &str,
        _interval: HistoryInterval,
        _bars: usize,
    ) -> Result<Vec<HistoryPoint>, FeedError> {
        Err(FeedError::NoData(symbol.to_string()))
    }
}

fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
}

fn config(symbols: &[&str]) -> CollectorConfig {
    CollectorConfig {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        tick_interval_secs: 5,
        bar_interval_secs: 300,
        ..CollectorConfig::default()
    }
}

#[tokio::test]
async fn test_ticks_become_five_minute_bars() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("market.db")).unwrap();

    // 120 ticks = 10 minutes of 5-second polls
    let gbp: Vec<f64> = (0..120).map(|i| 1.27 + (i % 7) as f64 * 0.0001).collect();
    let btc: Vec<f64> = (0..120).map(|i| 95_000.0 + (i % 11) as f64 * 10.0).collect();
    let feed = Arc::new(PathFeed::new(&[("GBPUSD", gbp.as_slice()), ("BTCUSD", btc.as_slice())]));

    let mut collector = KlineCollector::new(
        &config(&["GBPUSD", "BTCUSD"]),
        feed,
        store.clone(),
        PriceValidator::new(&ValidationConfig::default()),
    );

    let start = at(14, 30, 0);
    for i in 0..120 {
        collector.tick_once(start + Duration::seconds(5 * i)).await;
    }
    // Wall clock reaches 14:40 with no new ticks
    let written = collector.tick_once(at(14, 40, 0)).await;
    assert_eq!(written.len(), 2);

    for symbol in ["GBPUSD", "BTCUSD"] {
        let bars = store.recent_bars(symbol, 10).unwrap();
        assert_eq!(bars.len(), 2, "{}", symbol);
        assert_eq!(bars[0].start, at(14, 30, 0));
        assert_eq!(bars[1].start, at(14, 35, 0));
        assert_eq!(bars[0].ticks, 60);
        assert_eq!(bars[1].ticks, 60);
        for bar in &bars {
            assert!(bar.low <= bar.open && bar.open <= bar.high);
            assert!(bar.low <= bar.close && bar.close <= bar.high);
        }
    }

    let gbp_bars = store.recent_bars("GBPUSD", 10).unwrap();
    assert_eq!(gbp_bars[0].open, gbp[0]);
    assert_eq!(gbp_bars[0].close, gbp[59]);
    assert_eq!(gbp_bars[1].open, gbp[60]);

    let stats = collector.stats().read().await.clone();
    assert_eq!(stats.ticks_fetched, 240);
    assert_eq!(stats.bars_written, 4);
    assert_eq!(stats.last_bar, Some(at(14, 35, 0)));
}

#[tokio::test]
async fn test_outliers_do_not_reach_bars() {
    let store = Store::open_in_memory().unwrap();
    let path = [1.2700, 1.2702, 12.70, 1.2701, 0.0, 1.2703];
    let feed = Arc::new(PathFeed::new(&[("GBPUSD", &path[..])]));
    let mut collector = KlineCollector::new(
        &config(&["GBPUSD"]),
        feed,
        store.clone(),
        PriceValidator::new(&ValidationConfig::default()),
    );

    for i in 0..6 {
        collector.tick_once(at(9, 0, 5 * i)).await;
    }
    collector.tick_once(at(9, 5, 0)).await;

    let bar = store.latest_bar("GBPUSD").unwrap().unwrap();
    assert_eq!(bar.ticks, 4);
    assert_eq!(bar.high, 1.2703);
    assert_eq!(bar.low, 1.2700);
    assert_eq!(collector.stats().read().await.ticks_rejected, 2);
}

#[tokio::test]
async fn test_restart_merges_into_same_bucket() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("market.db");

    {
        let store = Store::open(&path).unwrap();
        let feed = Arc::new(PathFeed::new(&[("EURUSD", &[1.0500, 1.0510][..])]));
        let mut collector = KlineCollector::new(
            &config(&["EURUSD"]),
            feed,
            store,
            PriceValidator::new(&ValidationConfig::default()),
        );
        collector.tick_once(at(12, 0, 5)).await;
        collector.tick_once(at(12, 0, 10)).await;

        // Shutdown flush of the partial bar
        let (tx, rx) = tokio::sync::watch::channel(true);
        collector.run(rx).await.unwrap();
        drop(tx);
    }

    let store = Store::open(&path).unwrap();
    let feed = Arc::new(PathFeed::new(&[("EURUSD", &[1.0490, 1.0520][..])]));
    let mut collector = KlineCollector::new(
        &config(&["EURUSD"]),
        feed,
        store.clone(),
        PriceValidator::new(&ValidationConfig::default()),
    );
    collector.tick_once(at(12, 2, 0)).await;
    collector.tick_once(at(12, 3, 0)).await;
    collector.tick_once(at(12, 5, 0)).await;

    let bars = store.recent_bars("EURUSD", 10).unwrap();
    assert_eq!(bars.len(), 1);
    let bar = &bars[0];
    assert_eq!(bar.open, 1.0500);
    assert_eq!(bar.high, 1.0520);
    assert_eq!(bar.low, 1.0490);
    assert_eq!(bar.close, 1.0520);
    assert_eq!(bar.ticks, 4);
}

#[tokio::test]
async fn test_fill_history_with_simulated_feed() {
    let store = Store::open_in_memory().unwrap();
    let feed = SimulatedFeed::with_seed(11);
    let validator = PriceValidator::new(&ValidationConfig::default());

    let report = fill_history(
        &store,
        &feed,
        &validator,
        "BTCUSD",
        HistoryInterval::FiveMinutes,
        200,
    )
    .await
    .unwrap();

    assert_eq!(report.source, FillSource::Feed);
    assert_eq!(report.fetched, 200);
    assert_eq!(report.inserted + report.skipped, 200);

    // A second fill over the same window inserts nothing new
    let again = fill_history(
        &store,
        &feed,
        &validator,
        "BTCUSD",
        HistoryInterval::FiveMinutes,
        200,
    )
    .await
    .unwrap();
    assert!(again.inserted <= 1);
}

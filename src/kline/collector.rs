//! Tick collector
//!
//! Polls every configured symbol on a fixed interval, validates the quote,
//! folds it into the open bar and writes bars to the store as their bucket
//! closes.

use super::{Bar, BarAggregator};
use crate::config::CollectorConfig;
use crate::feed::{PriceFeed, PriceTick, PriceValidator, RejectReason, Validation};
use crate::storage::{Store, StoreError};
use crate::telemetry::{self, CounterMetric, GaugeMetric, LatencyMetric};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};

/// Collection statistics
#[derive(Debug, Default, Clone)]
pub struct CollectorStats {
    pub ticks_fetched: u64,
    pub ticks_rejected: u64,
    pub fetch_errors: u64,
    pub bars_written: u64,
    pub write_errors: u64,
    pub last_bar: Option<DateTime<Utc>>,
}

/// Last accepted price for the jump filter
#[derive(Debug, Clone, Copy)]
struct Reference {
    price: f64,
    at: DateTime<Utc>,
}

/// Polls the feed and writes closed bars
pub struct KlineCollector {
    feed: Arc<dyn PriceFeed>,
    store: Store,
    validator: PriceValidator,
    aggregator: BarAggregator,
    symbols: Vec<String>,
    tick_interval: Duration,
    reference_max_age: chrono::Duration,
    last_accepted: HashMap<String, Reference>,
    /// Consecutive jump-rejected prices per symbol
    rejected_run: HashMap<String, Vec<f64>>,
    stats: Arc<RwLock<CollectorStats>>,
}

impl KlineCollector {
    /// Create a collector for the configured symbols
    pub fn new(
        config: &CollectorConfig,
        feed: Arc<dyn PriceFeed>,
        store: Store,
        validator: PriceValidator,
    ) -> Self {
        let mut collector = Self {
            feed,
            store,
            validator,
            aggregator: BarAggregator::new(chrono::Duration::seconds(
                config.bar_interval_secs as i64,
            )),
            symbols: config.symbols.iter().map(|s| s.to_uppercase()).collect(),
            tick_interval: Duration::from_secs(config.tick_interval_secs),
            reference_max_age: chrono::Duration::seconds(
                (config.bar_interval_secs * u64::from(config.reference_max_age_bars)) as i64,
            ),
            last_accepted: HashMap::new(),
            rejected_run: HashMap::new(),
            stats: Arc::new(RwLock::new(CollectorStats::default())),
        };
        collector.seed_last_prices();
        collector
    }

    /// Seed jump detection from the newest stored bars
    fn seed_last_prices(&mut self) {
        for symbol in &self.symbols {
            match self.store.latest_bar(symbol) {
                Ok(Some(bar)) => {
                    let reference = Reference {
                        price: bar.close,
                        at: bar.timestamp,
                    };
                    self.last_accepted.insert(symbol.clone(), reference);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(symbol = %symbol, error = %e, "Could not read last bar"),
            }
        }
    }

    /// Reference price for the jump filter, if recent enough to trust
    fn reference(&self, symbol: &str, now: DateTime<Utc>) -> Option<f64> {
        self.last_accepted
            .get(symbol)
            .filter(|r| now - r.at <= self.reference_max_age)
            .map(|r| r.price)
    }

    /// Track a jump rejection; true when the run confirms a new price level
    fn confirm_jump(&mut self, symbol: &str, price: f64) -> bool {
        let keep = self.validator.reanchor_after();
        let run = self.rejected_run.entry(symbol.to_string()).or_default();
        run.push(price);
        if run.len() > keep {
            let excess = run.len() - keep;
            run.drain(..excess);
        }
        if self.validator.confirms_move(run) {
            self.rejected_run.remove(symbol);
            return true;
        }
        false
    }

    /// Shared statistics handle
    pub fn stats(&self) -> Arc<RwLock<CollectorStats>> {
        self.stats.clone()
    }

    /// Bar aggregator (open bars)
    pub fn aggregator(&self) -> &BarAggregator {
        &self.aggregator
    }

    /// Poll every symbol once and persist any bars that closed
    ///
    /// Returns the bars written during this tick.
    pub async fn tick_once(&mut self, now: DateTime<Utc>) -> Vec<Bar> {
        let mut closed = self.aggregator.close_elapsed(now);

        for symbol in self.symbols.clone() {
            let started = Instant::now();
            let price = match self.feed.latest_price(&symbol).await {
                Ok(price) => price,
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "Price fetch failed");
                    telemetry::increment(CounterMetric::FetchErrors, &symbol);
                    self.stats.write().await.fetch_errors += 1;
                    continue;
                }
            };
            telemetry::record_latency(LatencyMetric::PriceFetch, started.elapsed());
            telemetry::increment(CounterMetric::TicksFetched, &symbol);
            self.stats.write().await.ticks_fetched += 1;

            let last = self.reference(&symbol, now);
            if let Validation::Reject(reason) = self.validator.check(&symbol, price, last) {
                let confirmed =
                    matches!(reason, RejectReason::Jump { .. }) && self.confirm_jump(&symbol, price);
                if !confirmed {
                    tracing::warn!(symbol = %symbol, price, ?reason, "Rejected tick");
                    telemetry::increment(CounterMetric::TicksRejected, &symbol);
                    self.stats.write().await.ticks_rejected += 1;
                    continue;
                }
                tracing::warn!(
                    symbol = %symbol,
                    price,
                    previous = ?last,
                    "Jump confirmed by consecutive polls, moving reference"
                );
            } else {
                self.rejected_run.remove(&symbol);
            }

            self.last_accepted
                .insert(symbol.clone(), Reference { price, at: now });
            telemetry::set_gauge(GaugeMetric::LastPrice, &symbol, price);
            tracing::debug!(symbol = %symbol, price, "Tick");

            if let Some(bar) = self.aggregator.push(PriceTick::new(symbol, price, now)) {
                closed.push(bar);
            }
        }

        telemetry::set_gauge(GaugeMetric::OpenBars, "all", self.aggregator.open_count() as f64);
        self.persist(closed).await
    }

    /// Write bars, returning the ones that were stored
    async fn persist(&self, bars: Vec<Bar>) -> Vec<Bar> {
        let mut written = Vec::with_capacity(bars.len());
        for bar in bars {
            match self.write_bar(&bar) {
                Ok(()) => {
                    tracing::info!(
                        symbol = %bar.symbol,
                        start = %bar.start,
                        open = bar.open,
                        high = bar.high,
                        low = bar.low,
                        close = bar.close,
                        ticks = bar.ticks,
                        "Bar written"
                    );
                    telemetry::increment(CounterMetric::BarsWritten, &bar.symbol);
                    let mut s = self.stats.write().await;
                    s.bars_written += 1;
                    s.last_bar = Some(bar.start);
                    drop(s);
                    written.push(bar);
                }
                Err(e) => {
                    tracing::error!(symbol = %bar.symbol, start = %bar.start, error = %e, "Failed to write bar");
                    self.stats.write().await.write_errors += 1;
                }
            }
        }
        written
    }

    fn write_bar(&self, bar: &Bar) -> Result<(), StoreError> {
        self.store.upsert_bar(bar)
    }

    /// Run until `shutdown` flips to true, then flush partial bars
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        tracing::info!(
            symbols = ?self.symbols,
            tick_secs = self.tick_interval.as_secs(),
            bar_secs = self.aggregator.interval().num_seconds(),
            "Collector started"
        );

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    self.tick_once(Utc::now()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        let partial = self.aggregator.drain();
        let count = self.persist(partial).await.len();
        let stats = self.stats.read().await.clone();
        tracing::info!(
            partial_bars = count,
            ticks = stats.ticks_fetched,
            rejected = stats.ticks_rejected,
            bars = stats.bars_written,
            "Collector stopped"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationConfig;
    use crate::feed::{FeedError, HistoryInterval, HistoryPoint};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Feed returning scripted prices per call
    struct ScriptedFeed {
        prices: Mutex<VecDeque<Result<f64, FeedError>>>,
    }

    impl ScriptedFeed {
        fn new(prices: Vec<Result<f64, FeedError>>) -> Self {
            Self {
                prices: Mutex::new(prices.into()),
            }
        }
    }

    #[async_trait]
    impl PriceFeed for ScriptedFeed {
        async fn latest_price(&self, symbol: &str) -> Result<f64, FeedError> {
            self.prices
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(FeedError::NoData(symbol.to_string())))
        }

        async fn history(
            &self,
            _symbol: &str,
            _interval: HistoryInterval,
            _bars: usize,
        ) -> Result<Vec<HistoryPoint>, FeedError> {
            Ok(Vec::new())
        }
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, s).unwrap()
    }

    fn collector(prices: Vec<Result<f64, FeedError>>, store: Store) -> KlineCollector {
        let config = CollectorConfig {
            symbols: vec!["GBPUSD".to_string()],
            tick_interval_secs: 5,
            bar_interval_secs: 300,
            ..CollectorConfig::default()
        };
        KlineCollector::new(
            &config,
            Arc::new(ScriptedFeed::new(prices)),
            store,
            PriceValidator::new(&ValidationConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_bar_written_when_bucket_closes() {
        let store = Store::open_in_memory().unwrap();
        let mut c = collector(vec![Ok(1.2700), Ok(1.2750), Ok(1.2650), Ok(1.2710)], store.clone());

        assert!(c.tick_once(at(10, 0, 5)).await.is_empty());
        assert!(c.tick_once(at(10, 2, 0)).await.is_empty());
        assert!(c.tick_once(at(10, 4, 55)).await.is_empty());

        let written = c.tick_once(at(10, 5, 0)).await;
        assert_eq!(written.len(), 1);

        let bar = store.latest_bar("GBPUSD").unwrap().unwrap();
        assert_eq!(bar.start, at(10, 0, 0));
        assert_eq!(bar.open, 1.2700);
        assert_eq!(bar.high, 1.2750);
        assert_eq!(bar.low, 1.2650);
        assert_eq!(bar.close, 1.2650);
        assert_eq!(bar.ticks, 3);
    }

    #[tokio::test]
    async fn test_rejected_and_failed_ticks_counted() {
        let store = Store::open_in_memory().unwrap();
        let mut c = collector(
            vec![
                Ok(1.27),
                Ok(-1.0),
                Err(FeedError::NoData("GBPUSD".to_string())),
                Ok(1.90),
            ],
            store,
        );

        for s in 0..4 {
            c.tick_once(at(10, 0, s * 5)).await;
        }

        let stats = c.stats().read().await.clone();
        assert_eq!(stats.ticks_fetched, 3);
        assert_eq!(stats.ticks_rejected, 2);
        assert_eq!(stats.fetch_errors, 1);
        assert_eq!(c.aggregator().open_bar("GBPUSD").unwrap().ticks, 1);
    }

    #[tokio::test]
    async fn test_jump_check_seeded_from_store() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_bar(&Bar::flat("GBPUSD", at(9, 55, 0), 1.27)).unwrap();

        let mut c = collector(vec![Ok(1.60)], store);
        c.tick_once(at(10, 0, 5)).await;

        assert_eq!(c.stats().read().await.ticks_rejected, 1);
        assert_eq!(c.aggregator().open_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_stored_bar_does_not_anchor_jump_check() {
        let store = Store::open_in_memory().unwrap();
        let week_ago = at(10, 0, 0) - chrono::Duration::days(7);
        store.upsert_bar(&Bar::flat("GBPUSD", week_ago, 1.27)).unwrap();

        let mut c = collector(vec![Ok(1.34), Ok(1.341), Ok(1.342)], store.clone());
        c.tick_once(at(10, 0, 5)).await;
        c.tick_once(at(10, 0, 10)).await;
        c.tick_once(at(10, 0, 15)).await;
        let written = c.tick_once(at(10, 5, 0)).await;

        assert_eq!(c.stats().read().await.ticks_rejected, 0);
        assert_eq!(written.len(), 1);
        let bar = store.latest_bar("GBPUSD").unwrap().unwrap();
        assert_eq!(bar.start, at(10, 0, 0));
        assert_eq!(bar.open, 1.34);
        assert_eq!(bar.ticks, 3);
    }

    #[tokio::test]
    async fn test_consistent_jump_moves_reference() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_bar(&Bar::flat("GBPUSD", at(9, 55, 0), 1.27)).unwrap();

        let mut c = collector(vec![Ok(1.34), Ok(1.341), Ok(1.339), Ok(1.342)], store);
        for s in 1..=4 {
            c.tick_once(at(10, 0, s * 5)).await;
        }

        assert_eq!(c.stats().read().await.ticks_rejected, 2);
        let bar = c.aggregator().open_bar("GBPUSD").unwrap();
        assert_eq!(bar.open, 1.339);
        assert_eq!(bar.close, 1.342);
        assert_eq!(bar.ticks, 2);
    }

    #[tokio::test]
    async fn test_scattered_jumps_keep_reference() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_bar(&Bar::flat("GBPUSD", at(9, 55, 0), 1.27)).unwrap();

        let mut c = collector(vec![Ok(1.40), Ok(1.60), Ok(1.80), Ok(1.2710)], store);
        for s in 1..=4 {
            c.tick_once(at(10, 0, s * 5)).await;
        }

        assert_eq!(c.stats().read().await.ticks_rejected, 3);
        let bar = c.aggregator().open_bar("GBPUSD").unwrap();
        assert_eq!(bar.open, 1.2710);
        assert_eq!(bar.ticks, 1);
    }

    #[tokio::test]
    async fn test_run_flushes_partial_bar_on_shutdown() {
        let store = Store::open_in_memory().unwrap();
        let mut c = collector(vec![Ok(1.27), Ok(1.28)], store.clone());
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            c.run(rx).await.unwrap();
            c
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        let c = handle.await.unwrap();

        assert_eq!(c.aggregator().open_count(), 0);
        let bar = store.latest_bar("GBPUSD").unwrap().unwrap();
        assert_eq!(bar.open, 1.27);
        assert_eq!(bar.ticks, 1);
    }
}

//! Historical backfill

use super::{bucket_start, Bar};
use crate::feed::{HistoryInterval, HistoryPoint, PriceFeed, PriceValidator, SimulatedFeed};
use crate::storage::{Store, StoreError};
use serde::Serialize;

/// Where backfilled bars came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FillSource {
    /// Configured market-data provider
    Feed,
    /// Random-walk fallback
    Simulated,
}

/// Outcome of a backfill
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillReport {
    pub symbol: String,
    pub source: FillSource,
    pub fetched: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// Backfill up to `bars` historical bars for `symbol`
///
/// Falls back to a simulated walk when the feed fails or returns nothing.
/// Existing buckets are left untouched; implausible bars are skipped.
pub async fn fill_history(
    store: &Store,
    feed: &dyn PriceFeed,
    validator: &PriceValidator,
    symbol: &str,
    interval: HistoryInterval,
    bars: usize,
) -> Result<FillReport, StoreError> {
    let (points, source) = match feed.history(symbol, interval, bars).await {
        Ok(points) if !points.is_empty() => (points, FillSource::Feed),
        Ok(_) => {
            tracing::warn!(symbol, "Feed returned no history, using simulated data");
            (simulate(symbol, interval, bars).await, FillSource::Simulated)
        }
        Err(e) => {
            tracing::warn!(symbol, error = %e, "History fetch failed, using simulated data");
            (simulate(symbol, interval, bars).await, FillSource::Simulated)
        }
    };

    let mut report = FillReport {
        symbol: symbol.to_string(),
        source,
        fetched: points.len(),
        inserted: 0,
        skipped: 0,
    };

    for point in &points {
        if !is_plausible(validator, symbol, point) {
            tracing::debug!(symbol, ts = %point.timestamp, "Skipping implausible history bar");
            report.skipped += 1;
            continue;
        }
        let bar = Bar {
            symbol: symbol.to_string(),
            start: bucket_start(point.timestamp, interval.duration()),
            open: point.open,
            high: point.high,
            low: point.low,
            close: point.close,
            ticks: 0,
            timestamp: point.timestamp,
        };
        if store.insert_bar_if_absent(&bar)? {
            report.inserted += 1;
        } else {
            report.skipped += 1;
        }
    }

    tracing::info!(
        symbol,
        source = ?report.source,
        fetched = report.fetched,
        inserted = report.inserted,
        skipped = report.skipped,
        "History backfill complete"
    );
    Ok(report)
}

async fn simulate(symbol: &str, interval: HistoryInterval, bars: usize) -> Vec<HistoryPoint> {
    SimulatedFeed::new()
        .history(symbol, interval, bars)
        .await
        .unwrap_or_default()
}

fn is_plausible(validator: &PriceValidator, symbol: &str, p: &HistoryPoint) -> bool {
    p.high >= p.low
        && [p.open, p.high, p.low, p.close]
            .iter()
            .all(|price| validator.check_range(symbol, *price).is_accepted())
}

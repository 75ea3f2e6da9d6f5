//! K-line (OHLC bar) types

use crate::feed::PriceTick;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One OHLC bar for a symbol and bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Canonical symbol
    pub symbol: String,
    /// Bucket start time
    pub start: DateTime<Utc>,
    /// First tick price
    pub open: f64,
    /// Highest tick price
    pub high: f64,
    /// Lowest tick price
    pub low: f64,
    /// Last tick price
    pub close: f64,
    /// Number of ticks aggregated
    pub ticks: u32,
    /// Time of the last tick in the bucket
    pub timestamp: DateTime<Utc>,
}

impl Bar {
    /// Open a bar from its first tick
    pub fn from_tick(tick: &PriceTick, start: DateTime<Utc>) -> Self {
        Self {
            symbol: tick.symbol.clone(),
            start,
            open: tick.price,
            high: tick.price,
            low: tick.price,
            close: tick.price,
            ticks: 1,
            timestamp: tick.timestamp,
        }
    }

    /// Fold another tick into the bar
    pub fn apply(&mut self, tick: &PriceTick) {
        self.high = self.high.max(tick.price);
        self.low = self.low.min(tick.price);
        self.ticks += 1;
        // Ticks arrive in poll order; keep close tied to the latest timestamp
        if tick.timestamp >= self.timestamp {
            self.close = tick.price;
            self.timestamp = tick.timestamp;
        }
    }

    /// Single-price bar holding one tick
    pub fn flat(symbol: impl Into<String>, start: DateTime<Utc>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            start,
            open: price,
            high: price,
            low: price,
            close: price,
            ticks: 1,
            timestamp: start,
        }
    }
}

/// Start of the bucket containing `ts`, floored on the Unix epoch
///
/// 14:32:47 with a 5-minute interval gives 14:30:00.
pub fn bucket_start(ts: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let secs = interval.num_seconds().max(1);
    let floored = ts.timestamp().div_euclid(secs) * secs;
    Utc.timestamp_opt(floored, 0).single().unwrap_or(ts)
}

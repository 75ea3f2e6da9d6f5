//! Per-symbol tick aggregation into fixed-interval bars

use super::types::{bucket_start, Bar};
use crate::feed::PriceTick;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Accumulates ticks until each symbol's bucket closes
pub struct BarAggregator {
    /// Bar length
    interval: Duration,
    /// Currently open bar per symbol
    open: HashMap<String, Bar>,
}

impl BarAggregator {
    /// Create a new aggregator with the given bar length
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            open: HashMap::new(),
        }
    }

    /// Bar length
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Add a tick
    ///
    /// Returns the previous bar when the tick opens a later bucket. Ticks
    /// belonging to a bucket that has already been closed are dropped.
    pub fn push(&mut self, tick: PriceTick) -> Option<Bar> {
        let start = bucket_start(tick.timestamp, self.interval);

        if let Some(bar) = self.open.get_mut(&tick.symbol) {
            if bar.start == start {
                bar.apply(&tick);
                return None;
            }
            if bar.start > start {
                tracing::debug!(
                    symbol = %tick.symbol,
                    tick_ts = %tick.timestamp,
                    open_bucket = %bar.start,
                    "Dropping late tick"
                );
                return None;
            }
        }

        let new_bar = Bar::from_tick(&tick, start);
        self.open.insert(tick.symbol.clone(), new_bar)
    }

    /// Close every open bar whose bucket has ended by `now`
    pub fn close_elapsed(&mut self, now: DateTime<Utc>) -> Vec<Bar> {
        let current = bucket_start(now, self.interval);
        let expired: Vec<String> = self
            .open
            .iter()
            .filter(|(_, bar)| bar.start < current)
            .map(|(symbol, _)| symbol.clone())
            .collect();

        let mut closed: Vec<Bar> = expired
            .into_iter()
            .filter_map(|symbol| self.open.remove(&symbol))
            .collect();
        closed.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        closed
    }

    /// Take all open (partial) bars
    pub fn drain(&mut self) -> Vec<Bar> {
        let mut bars: Vec<Bar> = self.open.drain().map(|(_, bar)| bar).collect();
        bars.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        bars
    }

    /// The open bar for a symbol, if any
    pub fn open_bar(&self, symbol: &str) -> Option<&Bar> {
        self.open.get(symbol)
    }

    /// Number of symbols with an open bar
    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}

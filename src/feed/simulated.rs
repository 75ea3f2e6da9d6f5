//! Simulated random-walk feed
//!
//! Stands in for the real provider when it is unreachable or when running
//! offline. Forex symbols move up to ±0.2% per step, BTC up to ±1%, with a
//! slow drift that flips direction every 25 steps.

use super::{FeedError, HistoryInterval, HistoryPoint, PriceFeed};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Steps per drift phase
const DRIFT_PHASE: usize = 25;
/// Per-step drift magnitude
const DRIFT: f64 = 0.0001;

/// Random-walk price generator
pub struct SimulatedFeed {
    rng: Mutex<StdRng>,
    last: Mutex<HashMap<String, (f64, usize)>>,
}

impl SimulatedFeed {
    /// Create a feed seeded from the OS
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Create a deterministic feed
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            last: Mutex::new(HashMap::new()),
        }
    }

    /// Starting price for a symbol
    pub fn base_price(symbol: &str) -> f64 {
        match symbol.to_uppercase().as_str() {
            "GBPUSD" => 1.27,
            "EURUSD" => 1.05,
            "BTCUSD" => 95_000.0,
            _ => 1.0,
        }
    }

    /// Maximum fractional move per step
    fn step_size(symbol: &str) -> f64 {
        if symbol.to_uppercase().starts_with("BTC") {
            0.01
        } else {
            0.002
        }
    }

    /// Advance one step of the walk from `price`
    fn step(&self, symbol: &str, price: f64, step_index: usize) -> f64 {
        let size = Self::step_size(symbol);
        let change = self.rng.lock().random_range(-size..size);
        let next = price * (1.0 + change);
        if step_index % (DRIFT_PHASE * 2) < DRIFT_PHASE {
            next * (1.0 + DRIFT)
        } else {
            next * (1.0 - DRIFT)
        }
    }

    /// Generate `bars` consecutive closes starting from the base price
    pub fn generate_closes(&self, symbol: &str, bars: usize) -> Vec<f64> {
        let mut price = Self::base_price(symbol);
        (0..bars)
            .map(|i| {
                price = self.step(symbol, price, i);
                price
            })
            .collect()
    }
}

impl Default for SimulatedFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceFeed for SimulatedFeed {
    async fn latest_price(&self, symbol: &str) -> Result<f64, FeedError> {
        let key = symbol.to_uppercase();
        let (price, step_index) = self
            .last
            .lock()
            .get(&key)
            .copied()
            .unwrap_or((Self::base_price(&key), 0));

        let next = self.step(&key, price, step_index);
        self.last.lock().insert(key, (next, step_index + 1));
        Ok(next)
    }

    async fn history(
        &self,
        symbol: &str,
        interval: HistoryInterval,
        bars: usize,
    ) -> Result<Vec<HistoryPoint>, FeedError> {
        let now = Utc::now();
        let step = interval.duration();
        let closes = self.generate_closes(symbol, bars);

        let mut open = Self::base_price(symbol);
        let points = closes
            .into_iter()
            .enumerate()
            .map(|(i, close)| {
                let point = HistoryPoint {
                    timestamp: now - step * (bars - i) as i32,
                    open,
                    high: open.max(close),
                    low: open.min(close),
                    close,
                };
                open = close;
                point
            })
            .collect();

        Ok(points)
    }
}

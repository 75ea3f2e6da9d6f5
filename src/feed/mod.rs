//! Price feed module
//!
//! Polls quotes from Yahoo Finance (or a simulated random walk), maps
//! canonical symbols to provider tickers and filters implausible ticks.

mod simulated;
mod symbols;
mod types;
mod validate;
mod yahoo;

pub use simulated::SimulatedFeed;
pub use symbols::SymbolMap;
pub use types::{FeedError, HistoryInterval, HistoryPoint, PriceTick};
pub use validate::{PriceValidator, RejectReason, Validation};
pub use yahoo::{YahooConfig, YahooFeed, YAHOO_API_URL};

use crate::config::{FeedConfig, FeedProvider};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for price feed implementations
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Fetch the latest quote for a canonical symbol
    async fn latest_price(&self, symbol: &str) -> Result<f64, FeedError>;

    /// Fetch up to `bars` historical bars, oldest first
    async fn history(
        &self,
        symbol: &str,
        interval: HistoryInterval,
        bars: usize,
    ) -> Result<Vec<HistoryPoint>, FeedError>;
}

/// Build the feed selected in configuration
pub fn build_feed(config: &FeedConfig) -> Result<Arc<dyn PriceFeed>, FeedError> {
    let feed: Arc<dyn PriceFeed> = match config.provider {
        FeedProvider::Yahoo => Arc::new(YahooFeed::from_feed_config(config)?),
        FeedProvider::Simulated => Arc::new(SimulatedFeed::new()),
    };
    Ok(feed)
}

//! Fill command implementation

use super::open_store;
use crate::config::Config;
use crate::feed::{build_feed, HistoryInterval, PriceFeed, PriceValidator, SimulatedFeed, SymbolMap};
use crate::kline::fill_history;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct FillArgs {
    /// Symbol to backfill (defaults to every configured symbol)
    #[arg(short, long)]
    pub symbol: Option<String>,

    /// Number of bars to fetch per symbol
    #[arg(short, long, default_value_t = 300)]
    pub bars: usize,

    /// Bar interval: 1m, 5m, 15m, 30m, 1h
    #[arg(short, long, default_value = "5m")]
    pub interval: HistoryInterval,

    /// Use simulated prices instead of the provider
    #[arg(long)]
    pub simulated: bool,
}

impl FillArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = open_store(config)?;
        let validator = PriceValidator::new(&config.validation);
        let feed: Arc<dyn PriceFeed> = if self.simulated {
            Arc::new(SimulatedFeed::new())
        } else {
            build_feed(&config.feed)?
        };

        let symbol_map = SymbolMap::new(&config.feed.tickers);
        let symbols: Vec<String> = match &self.symbol {
            Some(s) => vec![symbol_map.canonical(s)],
            None => config
                .collector
                .symbols
                .iter()
                .map(|s| symbol_map.canonical(s))
                .collect(),
        };

        for symbol in symbols {
            let report = fill_history(
                &store,
                feed.as_ref(),
                &validator,
                &symbol,
                self.interval,
                self.bars,
            )
            .await?;
            println!(
                "{}: {} fetched ({:?}), {} inserted, {} skipped",
                report.symbol, report.fetched, report.source, report.inserted, report.skipped
            );
        }
        Ok(())
    }
}

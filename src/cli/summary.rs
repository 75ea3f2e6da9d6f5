//! Summary command implementation

use super::{open_store, summary_service};
use crate::config::Config;
use crate::feed::SymbolMap;
use chrono::Utc;
use clap::Args;

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Symbol to summarise
    #[arg(short, long, default_value = "GBPUSD")]
    pub symbol: String,
}

impl SummaryArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = open_store(config)?;
        let service = summary_service(config, store)?;
        let symbol = SymbolMap::new(&config.feed.tickers).canonical(&self.symbol);

        let summary = service.summarize(&symbol, Utc::now()).await?;
        println!("Market summary for {} ({})", summary.symbol, summary.model);
        println!("{}", "-".repeat(60));
        println!("{}", summary.summary);
        println!("{}", "-".repeat(60));
        println!(
            "Current {:.6}, change {:+.2}%, range {:.6} - {:.6}, {} points",
            summary.stats.current_price,
            summary.stats.change_pct,
            summary.stats.min_price,
            summary.stats.max_price,
            summary.stats.data_points
        );
        Ok(())
    }
}

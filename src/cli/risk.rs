//! Risk command implementation

use super::open_store;
use crate::config::Config;
use crate::feed::SymbolMap;
use crate::risk::RiskEngine;
use clap::Args;

#[derive(Args, Debug)]
pub struct RiskArgs {
    /// Symbol to analyse
    #[arg(short, long, default_value = "GBPUSD")]
    pub symbol: String,

    /// Number of most recent bars to use
    #[arg(short, long)]
    pub limit: Option<usize>,
}

impl RiskArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = open_store(config)?;
        let symbol = SymbolMap::new(&config.feed.tickers).canonical(&self.symbol);
        let limit = self.limit.unwrap_or(config.risk.default_points).max(1);

        let closes: Vec<f64> = store
            .recent_bars(&symbol, limit)?
            .into_iter()
            .map(|b| b.close)
            .collect();
        let report = RiskEngine::new(&config.risk).report(&closes);

        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}

//! Collect command implementation

use super::{open_store, shutdown_signal};
use crate::config::Config;
use crate::feed::{build_feed, PriceValidator};
use crate::kline::KlineCollector;
use clap::Args;
use tokio::sync::watch;

#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Collect only these symbols (defaults to the configured list)
    #[arg(short, long, value_delimiter = ',')]
    pub symbols: Vec<String>,
}

impl CollectArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut collector_config = config.collector.clone();
        if !self.symbols.is_empty() {
            collector_config.symbols = self.symbols.clone();
        }

        let store = open_store(config)?;
        let feed = build_feed(&config.feed)?;
        let mut collector = KlineCollector::new(
            &collector_config,
            feed,
            store,
            PriceValidator::new(&config.validation),
        );

        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            shutdown_signal().await;
            let _ = tx.send(true);
        });

        collector.run(rx).await
    }
}

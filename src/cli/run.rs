//! Run command implementation

use super::{open_store, shutdown_signal, summary_service, wait_for_shutdown};
use crate::api::{self, AppState};
use crate::config::Config;
use crate::feed::{build_feed, PriceValidator};
use crate::kline::KlineCollector;
use clap::Args;
use std::net::SocketAddr;
use tokio::sync::watch;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Override the API port
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = open_store(config)?;
        let feed = build_feed(&config.feed)?;
        let mut collector = KlineCollector::new(
            &config.collector,
            feed,
            store.clone(),
            PriceValidator::new(&config.validation),
        );

        let summaries = summary_service(config, store.clone())?;
        let state = AppState::new(config, store, summaries);
        let addr: SocketAddr = format!(
            "{}:{}",
            config.api.host,
            self.port.unwrap_or(config.api.port)
        )
        .parse()?;

        let (tx, rx) = watch::channel(false);
        let collector_rx = rx.clone();
        let collector_task = tokio::spawn(async move { collector.run(collector_rx).await });
        let mut api_task = tokio::spawn(api::serve(state, addr, wait_for_shutdown(rx)));

        let early_exit = tokio::select! {
            _ = shutdown_signal() => None,
            res = &mut api_task => Some(res),
        };
        let _ = tx.send(true);

        let api_result = match early_exit {
            Some(res) => res,
            None => api_task.await,
        };
        let collector_result = collector_task.await;

        api_result??;
        collector_result??;
        Ok(())
    }
}

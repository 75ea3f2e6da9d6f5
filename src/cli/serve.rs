//! Serve command implementation

use super::{open_store, shutdown_signal, summary_service};
use crate::api::{self, AppState};
use crate::config::Config;
use clap::Args;
use std::net::SocketAddr;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override the listen port
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl ServeArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = open_store(config)?;
        let summaries = summary_service(config, store.clone())?;
        let state = AppState::new(config, store, summaries);
        let addr: SocketAddr = format!(
            "{}:{}",
            config.api.host,
            self.port.unwrap_or(config.api.port)
        )
        .parse()?;

        api::serve(state, addr, shutdown_signal()).await
    }
}

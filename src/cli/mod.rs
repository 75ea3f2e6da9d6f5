//! CLI interface for market-dash
//!
//! Provides subcommands for:
//! - `run`: Collector and API in one process
//! - `collect`: Tick collector only
//! - `serve`: REST API and dashboard only
//! - `fill`: Backfill historical bars
//! - `risk`: Print a risk report
//! - `summary`: Generate an AI market summary
//! - `status`: Show stored data and LLM usage
//! - `backup`: Copy the database
//! - `config`: Show configuration

mod backup;
mod collect;
mod fill;
mod risk;
mod run;
mod serve;
mod status;
mod summary;

pub use backup::BackupArgs;
pub use collect::CollectArgs;
pub use fill::FillArgs;
pub use risk::RiskArgs;
pub use run::RunArgs;
pub use serve::ServeArgs;
pub use status::StatusArgs;
pub use summary::SummaryArgs;

use crate::ai::{LlmClient, OpenAiClient, SummaryService};
use crate::config::Config;
use crate::storage::Store;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(name = "market-dash")]
#[command(about = "Market tick collector, K-line store and risk dashboard")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run collector and API together
    Run(RunArgs),
    /// Collect ticks into bars (no API)
    Collect(CollectArgs),
    /// Serve the REST API and dashboard (no collection)
    Serve(ServeArgs),
    /// Backfill historical bars
    Fill(FillArgs),
    /// Print a risk report for a symbol
    Risk(RiskArgs),
    /// Generate an AI market summary
    Summary(SummaryArgs),
    /// Show stored data and LLM usage
    Status(StatusArgs),
    /// Back up the database
    Backup(BackupArgs),
    /// Show configuration
    Config,
}

/// Open the configured database
pub(crate) fn open_store(config: &Config) -> anyhow::Result<Store> {
    let store = Store::open(&config.storage.db_path)?;
    Ok(store)
}

/// Summary service backed by the configured LLM, if any
pub(crate) fn summary_service(config: &Config, store: Store) -> anyhow::Result<Arc<SummaryService>> {
    let llm = OpenAiClient::from_ai_config(&config.ai)?.map(|c| Arc::new(c) as Arc<dyn LlmClient>);
    if llm.is_none() {
        tracing::warn!(
            env = %config.ai.api_key_env,
            "No LLM API key set, AI summaries disabled"
        );
    }
    Ok(Arc::new(SummaryService::new(&config.ai, store, llm)))
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}

/// Resolves once the shutdown flag is set or its sender is gone
pub(crate) async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

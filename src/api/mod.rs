//! REST API
//!
//! Serves stored bars, moving averages, risk reports and AI summaries as
//! JSON, plus the HTML dashboard at `/`.

mod dashboard;
mod error;
mod handlers;

pub use dashboard::DASHBOARD_HTML;
pub use error::ApiError;
pub use handlers::SymbolQuery;

use crate::ai::SummaryService;
use crate::config::Config;
use crate::feed::SymbolMap;
use crate::risk::RiskEngine;
use crate::storage::Store;
use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub risk: Arc<RiskEngine>,
    pub summaries: Arc<SummaryService>,
    pub symbols: Arc<SymbolMap>,
    pub api: Arc<crate::config::ApiConfig>,
    pub bar_interval_secs: u64,
    /// Default number of closes fed to the risk engine
    pub risk_points: usize,
}

impl AppState {
    pub fn new(config: &Config, store: Store, summaries: Arc<SummaryService>) -> Self {
        Self {
            store,
            risk: Arc::new(RiskEngine::new(&config.risk)),
            summaries,
            symbols: Arc::new(SymbolMap::new(&config.feed.tickers)),
            api: Arc::new(config.api.clone()),
            bar_interval_secs: config.collector.bar_interval_secs,
            risk_points: config.risk.default_points,
        }
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/price", get(handlers::price))
        .route("/history", get(handlers::history))
        .route("/klines", get(handlers::klines))
        .route("/risk", get(handlers::risk))
        .route("/summary", get(handlers::summary))
        .route("/symbols", get(handlers::symbols))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(state: AppState, addr: SocketAddr, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("API stopped");
    Ok(())
}

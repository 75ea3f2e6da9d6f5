//! Route handlers

use super::error::ApiError;
use super::AppState;
use crate::indicators::{ema, sma};
use crate::kline::Bar;
use crate::risk::RiskReport;
use crate::storage::{Store, StoreError, SymbolSummary};
use crate::telemetry::{self, CounterMetric};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Common query parameters
#[derive(Debug, Default, Deserialize)]
pub struct SymbolQuery {
    pub symbol: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct PriceResponse {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

#[derive(Serialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub symbol: String,
    pub count: usize,
    pub data: Vec<HistoryPoint>,
}

#[derive(Serialize)]
pub struct KlinesResponse {
    pub symbol: String,
    pub interval_secs: u64,
    pub count: usize,
    pub bars: Vec<Bar>,
    pub moving_averages: BTreeMap<String, Vec<Option<f64>>>,
}

#[derive(Serialize)]
pub struct RiskResponse {
    pub symbol: String,
    #[serde(flatten)]
    pub report: RiskReport,
}

#[derive(Serialize)]
pub struct SymbolsResponse {
    pub symbols: Vec<SymbolSummary>,
}

impl AppState {
    fn symbol(&self, query: &SymbolQuery) -> String {
        match query.symbol.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => self.symbols.canonical(s),
            _ => self.symbols.canonical(&self.api.default_symbol),
        }
    }

    fn limit(&self, query: &SymbolQuery, default: usize) -> usize {
        query
            .limit
            .unwrap_or(default)
            .clamp(1, self.api.max_limit.max(1))
    }

    /// Run a store query on the blocking pool
    async fn query<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Store) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| ApiError::Internal(format!("Storage task failed: {}", e)))?
            .map_err(ApiError::from)
    }
}

/// Query string, with malformed input reported as a JSON 400
type QueryParams = Result<Query<SymbolQuery>, QueryRejection>;

pub async fn index() -> Html<&'static str> {
    Html(super::dashboard::DASHBOARD_HTML)
}

pub async fn health() -> Json<Value> {
    telemetry::increment(CounterMetric::HttpRequests, "/health");
    Json(json!({
        "message": "market-dash API is running",
        "status": "ok",
    }))
}

pub async fn price(
    State(state): State<AppState>,
    query: QueryParams,
) -> Result<Json<PriceResponse>, ApiError> {
    telemetry::increment(CounterMetric::HttpRequests, "/price");
    let Query(query) = query?;
    let symbol = state.symbol(&query);
    let key = symbol.clone();
    let bar = state
        .query(move |store| store.latest_bar(&key))
        .await?
        .ok_or_else(|| ApiError::NotFound("No data found".to_string()))?;

    Ok(Json(PriceResponse {
        symbol,
        timestamp: bar.timestamp,
        price: bar.close,
    }))
}

pub async fn history(
    State(state): State<AppState>,
    query: QueryParams,
) -> Result<Json<HistoryResponse>, ApiError> {
    telemetry::increment(CounterMetric::HttpRequests, "/history");
    let Query(query) = query?;
    let symbol = state.symbol(&query);
    let limit = state.limit(&query, state.api.default_limit);
    let key = symbol.clone();
    let data: Vec<HistoryPoint> = state
        .query(move |store| store.recent_bars(&key, limit))
        .await?
        .into_iter()
        .map(|b| HistoryPoint {
            timestamp: b.timestamp,
            price: b.close,
        })
        .collect();

    Ok(Json(HistoryResponse {
        symbol,
        count: data.len(),
        data,
    }))
}

pub async fn klines(
    State(state): State<AppState>,
    query: QueryParams,
) -> Result<Json<KlinesResponse>, ApiError> {
    telemetry::increment(CounterMetric::HttpRequests, "/klines");
    let Query(query) = query?;
    let symbol = state.symbol(&query);
    let limit = state.limit(&query, state.api.default_limit);
    let key = symbol.clone();
    let bars = state
        .query(move |store| store.recent_bars(&key, limit))
        .await?;

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let simple = state
        .api
        .ma_periods
        .iter()
        .map(|p| (format!("ma{}", p), sma(&closes, *p)));
    let exponential = state
        .api
        .ema_periods
        .iter()
        .map(|p| (format!("ema{}", p), ema(&closes, *p)));
    let moving_averages = simple.chain(exponential).collect();

    Ok(Json(KlinesResponse {
        symbol,
        interval_secs: state.bar_interval_secs,
        count: bars.len(),
        bars,
        moving_averages,
    }))
}

pub async fn risk(
    State(state): State<AppState>,
    query: QueryParams,
) -> Result<Json<RiskResponse>, ApiError> {
    telemetry::increment(CounterMetric::HttpRequests, "/risk");
    let Query(query) = query?;
    let symbol = state.symbol(&query);
    let limit = state.limit(&query, state.risk_points);
    let key = symbol.clone();
    let closes: Vec<f64> = state
        .query(move |store| store.recent_bars(&key, limit))
        .await?
        .into_iter()
        .map(|b| b.close)
        .collect();

    Ok(Json(RiskResponse {
        report: state.risk.report(&closes),
        symbol,
    }))
}

pub async fn summary(
    State(state): State<AppState>,
    query: QueryParams,
) -> Result<Json<crate::ai::MarketSummary>, ApiError> {
    telemetry::increment(CounterMetric::HttpRequests, "/summary");
    let Query(query) = query?;
    let symbol = state.symbol(&query);
    let summary = state.summaries.summarize(&symbol, Utc::now()).await?;
    Ok(Json(summary))
}

pub async fn symbols(State(state): State<AppState>) -> Result<Json<SymbolsResponse>, ApiError> {
    telemetry::increment(CounterMetric::HttpRequests, "/symbols");
    Ok(Json(SymbolsResponse {
        symbols: state.query(|store| store.symbol_summaries()).await?,
    }))
}

//! Yahoo Finance chart API client
//!
//! Uses the public `v8/finance/chart` endpoint for both the latest quote and
//! intraday history.

use super::{FeedError, HistoryInterval, HistoryPoint, PriceFeed, SymbolMap};
use crate::config::FeedConfig;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Yahoo Finance base URL
pub const YAHOO_API_URL: &str = "https://query1.finance.yahoo.com";

/// Yahoo rejects requests without a browser-like agent
const USER_AGENT: &str = "Mozilla/5.0 (compatible; market-dash/0.1)";

/// Configuration for the Yahoo client
#[derive(Debug, Clone)]
pub struct YahooConfig {
    /// Base URL for the chart API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Symbol to ticker mapping
    pub symbols: SymbolMap,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: YAHOO_API_URL.to_string(),
            timeout: Duration::from_secs(10),
            symbols: SymbolMap::new(&FeedConfig::default().tickers),
        }
    }
}

/// Client for Yahoo Finance quotes
pub struct YahooFeed {
    config: YahooConfig,
    client: Client,
}

impl YahooFeed {
    /// Create a new client with custom configuration
    pub fn with_config(config: YahooConfig) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { config, client })
    }

    /// Create a client from the `[feed]` config section
    pub fn from_feed_config(config: &FeedConfig) -> Result<Self, FeedError> {
        Self::with_config(YahooConfig {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            symbols: SymbolMap::new(&config.tickers),
        })
    }

    /// Build the chart URL for a canonical symbol
    fn chart_url(&self, symbol: &str) -> String {
        format!(
            "{}/v8/finance/chart/{}",
            self.config.base_url,
            self.config.symbols.ticker_for(symbol)
        )
    }

    /// Fetch and decode one chart response
    async fn fetch_chart(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<ChartResult, FeedError> {
        let url = self.chart_url(symbol);
        tracing::debug!(url = %url, range, interval, "Fetching Yahoo chart");

        let response = self
            .client
            .get(&url)
            .query(&[("range", range), ("interval", interval)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Status { status, body });
        }

        let text = response.text().await?;
        parse_chart(symbol, &text)
    }
}

#[async_trait]
impl PriceFeed for YahooFeed {
    async fn latest_price(&self, symbol: &str) -> Result<f64, FeedError> {
        let chart = self.fetch_chart(symbol, "1d", "1m").await?;
        latest_from_chart(symbol, &chart)
    }

    async fn history(
        &self,
        symbol: &str,
        interval: HistoryInterval,
        bars: usize,
    ) -> Result<Vec<HistoryPoint>, FeedError> {
        let chart = self.fetch_chart(symbol, "7d", interval.as_str()).await?;
        let mut points = history_from_chart(&chart);
        if points.len() > bars {
            points.drain(..points.len() - bars);
        }
        Ok(points)
    }
}

/// Top-level chart response
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

/// OHLC columns; Yahoo emits `null` for empty intervals
#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Decode a chart payload into its first result
fn parse_chart(symbol: &str, body: &str) -> Result<ChartResult, FeedError> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|e| FeedError::Malformed(e.to_string()))?;

    if let Some(err) = response.chart.error {
        return Err(FeedError::Malformed(format!(
            "{}: {}",
            err.code,
            err.description.unwrap_or_default()
        )));
    }

    response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| FeedError::NoData(symbol.to_string()))
}

/// Latest price: market price from meta, else the last non-null close
fn latest_from_chart(symbol: &str, chart: &ChartResult) -> Result<f64, FeedError> {
    if let Some(price) = chart.meta.regular_market_price {
        return Ok(price);
    }
    chart
        .indicators
        .quote
        .first()
        .and_then(|q| q.close.iter().rev().flatten().next().copied())
        .ok_or_else(|| FeedError::NoData(symbol.to_string()))
}

/// Zip timestamps with OHLC columns, skipping incomplete rows
fn history_from_chart(chart: &ChartResult) -> Vec<HistoryPoint> {
    let Some(quote) = chart.indicators.quote.first() else {
        return Vec::new();
    };

    chart
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let timestamp: DateTime<Utc> = Utc.timestamp_opt(*ts, 0).single()?;
            Some(HistoryPoint {
                timestamp,
                open: (*quote.open.get(i)?)?,
                high: (*quote.high.get(i)?)?,
                low: (*quote.low.get(i)?)?,
                close: (*quote.close.get(i)?)?,
            })
        })
        .collect()
}

//! Cached, rate-limited market summaries

use super::{AiError, LlmClient, UsageDecision, UsageTracker};
use crate::config::AiConfig;
use crate::storage::Store;
use crate::telemetry::{self, CounterMetric, LatencyMetric};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// System message sent with every prompt
pub const SYSTEM_PROMPT: &str = "You are an expert financial market analyst with deep knowledge \
of forex, crypto, and commodity markets.";

/// Price statistics over the lookback window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceStats {
    pub current_price: f64,
    /// First price in the window
    pub previous_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub price_change: f64,
    pub change_pct: f64,
    pub data_points: usize,
}

impl PriceStats {
    /// Statistics for a series, `None` under two prices
    pub fn from_prices(prices: &[f64]) -> Option<Self> {
        if prices.len() < 2 {
            return None;
        }
        let current = prices[prices.len() - 1];
        let previous = prices[0];
        let change = current - previous;
        Some(Self {
            current_price: current,
            previous_price: previous,
            min_price: prices.iter().copied().fold(f64::INFINITY, f64::min),
            max_price: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            price_change: change,
            change_pct: if previous != 0.0 {
                change / previous * 100.0
            } else {
                0.0
            },
            data_points: prices.len(),
        })
    }
}

/// Analyst prompt for a symbol's recent statistics
pub fn build_prompt(symbol: &str, stats: &PriceStats, lookback_days: i64) -> String {
    format!(
        "You are a professional financial analyst. Based on the following {days}-day trading data, \
generate a brief market analysis summary in English (120-150 words).

Symbol: {symbol}
Current Price: {current:.6}
{days}-Day Change: {change:+.6} ({pct:+.2}%)
{days}-Day High: {high:.6}
{days}-Day Low: {low:.6}
Data Points: {points}

Please analyze:
1. Price trend (uptrend/downtrend/consolidation)
2. Support and resistance levels
3. Market volatility assessment
4. Key market signals
5. Brief trading outlook

Format: Provide a concise analysis without numbering or bullet points. Write as a professional market summary.",
        days = lookback_days,
        symbol = symbol,
        current = stats.current_price,
        change = stats.price_change,
        pct = stats.change_pct,
        high = stats.max_price,
        low = stats.min_price,
        points = stats.data_points,
    )
}

/// A generated summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSummary {
    pub symbol: String,
    pub summary: String,
    pub stats: PriceStats,
    pub model: String,
    pub generated_at: DateTime<Utc>,
    /// Served from cache rather than generated for this request
    pub cached: bool,
    /// Cache entry past its TTL, served because calls are rate limited
    pub stale: bool,
}

/// Produces summaries while respecting the call budget
pub struct SummaryService {
    store: Store,
    llm: Option<Arc<dyn LlmClient>>,
    usage: UsageTracker,
    cache: Mutex<HashMap<String, MarketSummary>>,
    cache_ttl: Duration,
    lookback: Duration,
    api_key_env: String,
}

impl SummaryService {
    pub fn new(config: &AiConfig, store: Store, llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self {
            store,
            llm,
            usage: UsageTracker::new(
                config.usage_file.clone(),
                config.max_calls_per_day,
                config.cooldown_secs,
            ),
            cache: Mutex::new(HashMap::new()),
            cache_ttl: Duration::seconds(config.cache_ttl_secs as i64),
            lookback: Duration::days(config.lookback_days.max(1)),
            api_key_env: config.api_key_env.clone(),
        }
    }

    /// Whether an LLM backend is available
    pub fn is_configured(&self) -> bool {
        self.llm.is_some()
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Summary for `symbol`, from cache when fresh
    pub async fn summarize(&self, symbol: &str, now: DateTime<Utc>) -> Result<MarketSummary, AiError> {
        let cached = self.cache.lock().get(symbol).cloned();
        if let Some(entry) = &cached {
            if now - entry.generated_at < self.cache_ttl {
                return Ok(MarketSummary {
                    cached: true,
                    ..entry.clone()
                });
            }
        }

        let llm = self
            .llm
            .clone()
            .ok_or_else(|| AiError::NotConfigured(self.api_key_env.clone()))?;

        let prices: Vec<f64> = self
            .store
            .bars_since(symbol, now - self.lookback)?
            .into_iter()
            .map(|b| b.close)
            .collect();
        let stats = PriceStats::from_prices(&prices)
            .ok_or(AiError::InsufficientData { points: prices.len() })?;

        if let UsageDecision::Limited { reason, wait_secs } = self.usage.check(now) {
            telemetry::increment(CounterMetric::LlmRateLimited, symbol);
            if let Some(entry) = cached {
                tracing::info!(symbol, %reason, wait_secs, "Rate limited, serving stale summary");
                return Ok(MarketSummary {
                    cached: true,
                    stale: true,
                    ..entry
                });
            }
            return Err(AiError::RateLimited { reason, wait_secs });
        }

        // Failed calls still count against the budget
        self.usage.record(now)?;
        telemetry::increment(CounterMetric::LlmCalls, symbol);

        let prompt = build_prompt(symbol, &stats, self.lookback.num_days());
        let started = Instant::now();
        let text = llm.complete(SYSTEM_PROMPT, &prompt).await;
        telemetry::record_latency(LatencyMetric::LlmCompletion, started.elapsed());
        let text = text.map_err(|e| {
            tracing::warn!(symbol, error = %e, "LLM call failed");
            e
        })?;

        tracing::info!(symbol, chars = text.len(), "Generated market summary");
        let summary = MarketSummary {
            symbol: symbol.to_string(),
            summary: text,
            stats,
            model: llm.model().to_string(),
            generated_at: now,
            cached: false,
            stale: false,
        };
        self.cache.lock().insert(symbol.to_string(), summary.clone());
        Ok(summary)
    }
}

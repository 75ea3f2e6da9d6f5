//! Price feed types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A single polled quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    /// Canonical symbol (e.g., "GBPUSD")
    pub symbol: String,
    /// Quoted price
    pub price: f64,
    /// Local timestamp when the quote was fetched
    pub timestamp: DateTime<Utc>,
}

impl PriceTick {
    /// Create a new tick
    pub fn new(symbol: impl Into<String>, price: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp,
        }
    }
}

/// One historical bar as returned by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Bar interval accepted for history backfill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HistoryInterval {
    #[serde(rename = "1m")]
    OneMinute,
    #[default]
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
}

impl HistoryInterval {
    /// Provider query value
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryInterval::OneMinute => "1m",
            HistoryInterval::FiveMinutes => "5m",
            HistoryInterval::FifteenMinutes => "15m",
            HistoryInterval::ThirtyMinutes => "30m",
            HistoryInterval::OneHour => "1h",
        }
    }

    /// Interval length in minutes
    pub fn minutes(&self) -> i64 {
        match self {
            HistoryInterval::OneMinute => 1,
            HistoryInterval::FiveMinutes => 5,
            HistoryInterval::FifteenMinutes => 15,
            HistoryInterval::ThirtyMinutes => 30,
            HistoryInterval::OneHour => 60,
        }
    }

    /// Interval length as a duration
    pub fn duration(&self) -> Duration {
        Duration::minutes(self.minutes())
    }
}

impl fmt::Display for HistoryInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryInterval {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1m" => Ok(HistoryInterval::OneMinute),
            "5m" => Ok(HistoryInterval::FiveMinutes),
            "15m" => Ok(HistoryInterval::FifteenMinutes),
            "30m" => Ok(HistoryInterval::ThirtyMinutes),
            "1h" => Ok(HistoryInterval::OneHour),
            other => Err(FeedError::InvalidInterval(other.to_string())),
        }
    }
}

/// Price feed errors
#[derive(Debug, Error)]
pub enum FeedError {
    /// Transport-level failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider answered with a non-success status
    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },
    /// Response body did not have the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),
    /// Provider had no usable price for the symbol
    #[error("No data for {0}")]
    NoData(String),
    /// Unsupported history interval
    #[error("Unsupported interval: {0}")]
    InvalidInterval(String),
}

//! Risk types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Overall risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Not enough data to score
    Unknown,
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Level for a 0-100 score
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            RiskLevel::Critical
        } else if score >= 50.0 {
            RiskLevel::High
        } else if score >= 30.0 {
            RiskLevel::Medium
        } else if score >= 10.0 {
            RiskLevel::Low
        } else {
            RiskLevel::Minimal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Unknown => "UNKNOWN",
            RiskLevel::Minimal => "MINIMAL",
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Warning,
    Alert,
    Critical,
}

/// Kind of risk signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    /// Current volatility above the configured threshold
    HighVolatility,
    /// Latest price far outside its rolling band
    PriceAnomaly,
    /// Overall level reached HIGH or CRITICAL
    RiskLevelChange,
    /// Volatility in the top decile of its own history
    VolatilitySpike,
}

/// A risk warning with a suggested action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSignal {
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub severity: Severity,
    pub message: String,
    pub recommendation: String,
}

/// Return volatility statistics
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct VolatilityStats {
    #[serde(rename = "current_volatility")]
    pub current: f64,
    #[serde(rename = "avg_volatility")]
    pub average: f64,
    /// Share of rolling windows strictly below the current one, 0-100
    #[serde(rename = "volatility_percentile")]
    pub percentile: f64,
    #[serde(rename = "is_high_volatility")]
    pub is_high: bool,
}

/// Rolling Z-score anomaly detection result
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AnomalyStats {
    /// Indices into the price series
    pub indices: Vec<usize>,
    pub prices: Vec<f64>,
    /// Z-score of the last price of every window with non-zero std
    pub z_scores: Vec<f64>,
    pub latest_z_score: f64,
}

impl AnomalyStats {
    pub fn has_anomaly(&self) -> bool {
        !self.indices.is_empty()
    }

    pub fn count(&self) -> usize {
        self.indices.len()
    }
}

/// Scored risk for a series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// Unrounded 0-100 score
    pub score: f64,
    pub factors: Vec<String>,
    pub volatility: VolatilityStats,
    pub anomalies: AnomalyStats,
}

impl RiskAssessment {
    /// Score as reported, truncated toward zero
    pub fn score_int(&self) -> u32 {
        self.score.max(0.0) as u32
    }
}

/// Headline numbers of a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub risk_level: RiskLevel,
    pub risk_score: u32,
    pub current_price: f64,
    /// First to last price change in percent
    pub price_change_pct: f64,
    pub data_points: usize,
}

/// Anomaly section of a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalySummary {
    pub detected: bool,
    pub count: usize,
    pub latest_z_score: f64,
}

/// Full risk report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskReport {
    Ok {
        timestamp: DateTime<Utc>,
        summary: ReportSummary,
        volatility: VolatilityStats,
        anomalies: AnomalySummary,
        signals: Vec<RiskSignal>,
        risk_factors: Vec<String>,
        recommendations: Vec<String>,
    },
    InsufficientData {
        message: String,
        data_points: usize,
        required_points: usize,
    },
}

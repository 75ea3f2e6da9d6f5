//! Risk module
//!
//! Rolling-statistics risk scoring over a close-price series: return
//! volatility, Z-score anomaly detection, a 0-100 risk score and the
//! signals derived from it.

mod engine;
pub mod stats;
mod types;

pub use engine::RiskEngine;
pub use types::{
    AnomalyStats, AnomalySummary, ReportSummary, RiskAssessment, RiskLevel, RiskReport,
    RiskSignal, Severity, SignalType, VolatilityStats,
};

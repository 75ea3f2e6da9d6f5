//! Risk engine

use super::stats::{mean, returns, rolling_std, sample_std};
use super::types::{
    AnomalyStats, AnomalySummary, ReportSummary, RiskAssessment, RiskLevel, RiskReport,
    RiskSignal, Severity, SignalType, VolatilityStats,
};
use crate::config::RiskConfig;
use chrono::Utc;

/// |Z| above which the latest price adds to the score
const Z_PENALTY_START: f64 = 2.0;
/// Percentile above which volatility counts as a spike
const SPIKE_PERCENTILE: f64 = 90.0;

/// Scores risk over a close-price series (oldest first)
#[derive(Debug, Clone)]
pub struct RiskEngine {
    window: usize,
    anomaly_threshold: f64,
    high_volatility_threshold: f64,
}

impl RiskEngine {
    /// Create an engine from configuration
    pub fn new(config: &RiskConfig) -> Self {
        Self {
            window: config.volatility_window.max(2),
            anomaly_threshold: config.anomaly_threshold,
            high_volatility_threshold: config.high_volatility_threshold,
        }
    }

    /// Rolling window length
    pub fn window(&self) -> usize {
        self.window
    }

    /// Volatility of simple returns
    pub fn volatility(&self, prices: &[f64]) -> VolatilityStats {
        if prices.len() < 2 {
            return VolatilityStats::default();
        }

        let rets = returns(prices);
        if rets.len() < self.window {
            let current = sample_std(&rets);
            return VolatilityStats {
                current,
                average: current,
                percentile: 50.0,
                is_high: current > self.high_volatility_threshold,
            };
        }

        let vols: Vec<f64> = rolling_std(&rets, self.window).into_iter().flatten().collect();
        let current = vols.last().copied().unwrap_or_default();
        let below = vols.iter().filter(|v| **v < current).count();

        VolatilityStats {
            current,
            average: mean(&vols),
            percentile: below as f64 / vols.len() as f64 * 100.0,
            is_high: current > self.high_volatility_threshold,
        }
    }

    /// Z-score of each window's last price against that window
    pub fn detect_anomalies(&self, prices: &[f64]) -> AnomalyStats {
        let mut stats = AnomalyStats::default();
        if prices.len() < self.window {
            return stats;
        }

        for end in self.window - 1..prices.len() {
            let window = &prices[end + 1 - self.window..=end];
            let std = sample_std(window);
            if std <= 0.0 {
                continue;
            }
            let z = (prices[end] - mean(window)) / std;
            stats.z_scores.push(z);
            if z.abs() > self.anomaly_threshold {
                stats.indices.push(end);
                stats.prices.push(prices[end]);
            }
        }

        stats.latest_z_score = stats.z_scores.last().copied().unwrap_or_default();
        stats
    }

    /// Score the series and list the contributing factors
    pub fn assess(&self, prices: &[f64]) -> RiskAssessment {
        if prices.len() < 2 {
            return RiskAssessment {
                level: RiskLevel::Unknown,
                score: 0.0,
                factors: Vec::new(),
                volatility: VolatilityStats::default(),
                anomalies: AnomalyStats::default(),
            };
        }

        let volatility = self.volatility(prices);
        let anomalies = self.detect_anomalies(prices);
        let mut score = 0.0;
        let mut factors = Vec::new();

        score += (volatility.percentile * 0.4).min(40.0);
        if volatility.is_high {
            factors.push(format!("High volatility ({:.4})", volatility.current));
        }

        if anomalies.has_anomaly() {
            score += (anomalies.count() as f64 * 10.0).min(30.0);
            factors.push(format!("{} anomalous prices detected", anomalies.count()));
        }

        let z = anomalies.latest_z_score.abs();
        if z > Z_PENALTY_START {
            score += ((z - Z_PENALTY_START) * 15.0).min(30.0);
            factors.push(format!("Latest price far from its mean (Z={:.2})", z));
        }

        RiskAssessment {
            level: RiskLevel::from_score(score),
            score,
            factors,
            volatility,
            anomalies,
        }
    }

    /// Warnings derived from an assessment; none under a full window of prices
    pub fn signals(&self, prices: &[f64]) -> Vec<RiskSignal> {
        if prices.len() < self.window {
            return Vec::new();
        }
        self.signals_for(&self.assess(prices))
    }

    fn signals_for(&self, assessment: &RiskAssessment) -> Vec<RiskSignal> {
        let vol = &assessment.volatility;
        let anomalies = &assessment.anomalies;
        let mut signals = Vec::new();

        if vol.is_high {
            signals.push(RiskSignal {
                signal_type: SignalType::HighVolatility,
                severity: Severity::Warning,
                message: format!(
                    "Current volatility {:.4} exceeds threshold {:.4}",
                    vol.current, self.high_volatility_threshold
                ),
                recommendation: "Consider reducing position size or tightening stops".to_string(),
            });
        }

        if anomalies.has_anomaly() && anomalies.latest_z_score.abs() > self.anomaly_threshold {
            signals.push(RiskSignal {
                signal_type: SignalType::PriceAnomaly,
                severity: Severity::Alert,
                message: format!("Price anomaly detected, Z-score = {:.2}", anomalies.latest_z_score),
                recommendation: "Trade cautiously, sharp moves or bad data are possible".to_string(),
            });
        }

        if matches!(assessment.level, RiskLevel::High | RiskLevel::Critical) {
            signals.push(RiskSignal {
                signal_type: SignalType::RiskLevelChange,
                severity: if assessment.level == RiskLevel::Critical {
                    Severity::Critical
                } else {
                    Severity::Warning
                },
                message: format!(
                    "Risk level: {} (score: {}/100)",
                    assessment.level,
                    assessment.score_int()
                ),
                recommendation: "Market risk is elevated, reduce exposure or pause trading"
                    .to_string(),
            });
        }

        if vol.percentile > SPIKE_PERCENTILE {
            signals.push(RiskSignal {
                signal_type: SignalType::VolatilitySpike,
                severity: Severity::Warning,
                message: format!(
                    "Volatility near historical high ({:.1}th percentile)",
                    vol.percentile
                ),
                recommendation: "Uncertainty is rising, watch risk controls".to_string(),
            });
        }

        signals
    }

    /// Complete report for a series
    pub fn report(&self, prices: &[f64]) -> RiskReport {
        if prices.len() < 2 {
            return RiskReport::InsufficientData {
                message: "Not enough data to build a risk report".to_string(),
                data_points: prices.len(),
                required_points: self.window,
            };
        }

        let assessment = self.assess(prices);
        let signals = if prices.len() < self.window {
            Vec::new()
        } else {
            self.signals_for(&assessment)
        };

        let first = prices[0];
        let current_price = prices[prices.len() - 1];
        let price_change_pct = if first != 0.0 {
            (current_price - first) / first * 100.0
        } else {
            0.0
        };

        RiskReport::Ok {
            timestamp: Utc::now(),
            summary: ReportSummary {
                risk_level: assessment.level,
                risk_score: assessment.score_int(),
                current_price,
                price_change_pct,
                data_points: prices.len(),
            },
            volatility: assessment.volatility,
            anomalies: AnomalySummary {
                detected: assessment.anomalies.has_anomaly(),
                count: assessment.anomalies.count(),
                latest_z_score: assessment.anomalies.latest_z_score,
            },
            recommendations: signals.iter().map(|s| s.recommendation.clone()).collect(),
            signals,
            risk_factors: assessment.factors,
        }
    }
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new(&RiskConfig::default())
    }
}

//! Tick validation
//!
//! Drops quotes that are obviously bad data before they reach a bar:
//! non-finite or non-positive prices, prices outside a per-symbol plausible
//! band, and single-poll jumps too large to be real.

use crate::config::ValidationConfig;
use serde::Serialize;
use std::collections::HashMap;

/// Result of validating a price
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// Price is usable
    Accept,
    /// Price rejected
    Reject(RejectReason),
}

impl Validation {
    /// Whether the price was accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, Validation::Accept)
    }
}

/// Reason for price rejection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RejectReason {
    /// NaN or infinite
    NotFinite,
    /// Zero or negative
    NotPositive(f64),
    /// Outside the configured band
    OutOfRange { price: f64, min: f64, max: f64 },
    /// Moved too far from the last accepted price
    Jump { price: f64, last: f64, move_pct: f64 },
}

/// Per-symbol price sanity checks
#[derive(Debug, Clone)]
pub struct PriceValidator {
    bands: HashMap<String, (f64, f64)>,
    max_jump_pct: f64,
    reanchor_after: usize,
}

impl PriceValidator {
    /// Create a validator from configuration
    pub fn new(config: &ValidationConfig) -> Self {
        let bands = config
            .bands
            .iter()
            .map(|(s, [min, max])| (s.to_uppercase(), (*min, *max)))
            .collect();
        Self {
            bands,
            max_jump_pct: config.max_jump_pct,
            reanchor_after: config.reanchor_after,
        }
    }

    /// Number of agreeing jump rejections needed to move the reference
    pub fn reanchor_after(&self) -> usize {
        self.reanchor_after
    }

    /// Whether the latest rejected prices show a real level shift
    ///
    /// True once the last `reanchor_after` prices all lie within
    /// `max_jump_pct` of each other.
    pub fn confirms_move(&self, rejected: &[f64]) -> bool {
        let n = self.reanchor_after.max(1);
        if rejected.len() < n {
            return false;
        }
        let recent = &rejected[rejected.len() - n..];
        let lo = recent.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        lo > 0.0 && (hi - lo) / lo <= self.max_jump_pct
    }

    /// Static checks only: finite, positive, inside the symbol's band
    pub fn check_range(&self, symbol: &str, price: f64) -> Validation {
        if !price.is_finite() {
            return Validation::Reject(RejectReason::NotFinite);
        }
        if price <= 0.0 {
            return Validation::Reject(RejectReason::NotPositive(price));
        }
        if let Some(&(min, max)) = self.bands.get(&symbol.to_uppercase()) {
            if price < min || price > max {
                return Validation::Reject(RejectReason::OutOfRange { price, min, max });
            }
        }
        Validation::Accept
    }

    /// Full check including the jump filter against the last accepted price
    pub fn check(&self, symbol: &str, price: f64, last_accepted: Option<f64>) -> Validation {
        let static_result = self.check_range(symbol, price);
        if !static_result.is_accepted() {
            return static_result;
        }

        if let Some(last) = last_accepted.filter(|l| *l > 0.0) {
            let move_pct = ((price - last) / last).abs();
            if move_pct > self.max_jump_pct {
                return Validation::Reject(RejectReason::Jump {
                    price,
                    last,
                    move_pct,
                });
            }
        }

        Validation::Accept
    }
}

impl Default for PriceValidator {
    fn default() -> Self {
        Self::new(&ValidationConfig::default())
    }
}

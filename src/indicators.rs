//! Moving averages for the dashboard
//!
//! Both functions return one entry per input value, `None` until the first
//! full window.

/// Simple moving average over `period` values
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let mut sum: f64 = values[..period].iter().sum();
    out[period - 1] = Some(sum / period as f64);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out[i] = Some(sum / period as f64);
    }
    out
}

/// Exponential moving average seeded with the SMA of the first window
///
/// Smoothing factor is `2 / (period + 1)`.
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(prev);
    for i in period..values.len() {
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        out[i] = Some(prev);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Option<f64>, b: f64) -> bool {
        a.map(|v| (v - b).abs() < 1e-9).unwrap_or(false)
    }

    #[test]
    fn test_sma() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(out.len(), 5);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert!(close(out[2], 2.0));
        assert!(close(out[3], 3.0));
        assert!(close(out[4], 4.0));
    }

    #[test]
    fn test_ema() {
        let out = ema(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(out[1], None);
        assert!(close(out[2], 2.0));
        // alpha = 0.5: 0.5 * 4 + 0.5 * 2
        assert!(close(out[3], 3.0));
    }

    #[test]
    fn test_degenerate_periods() {
        assert!(sma(&[1.0, 2.0], 0).iter().all(Option::is_none));
        assert!(ema(&[1.0, 2.0], 5).iter().all(Option::is_none));
        assert!(sma(&[], 3).is_empty());
    }

    #[test]
    fn test_period_one_is_identity() {
        let values = [1.5, 2.5, 0.5];
        let out = sma(&values, 1);
        for (o, v) in out.iter().zip(values) {
            assert!(close(*o, v));
        }
    }
}

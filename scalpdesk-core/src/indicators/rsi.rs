//! Relative Strength Index (RSI).
//!
//! Wilder smoothing of average gains and average losses:
//! avg = (avg * (period - 1) + x) / period.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period.
//! avg_loss == 0 → RSI = 100 exactly, including a perfectly flat series.

use super::{closes, Indicator};
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        rsi_of_series(&closes(candles), self.period)
    }
}

/// Compute RSI values from a pre-extracted f64 slice.
///
/// The first value lands at index `period`; earlier positions are NaN.
pub fn rsi_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period + 1 {
        return result;
    }

    // Seed from the first `period` differences
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let ch = values[i] - values[i - 1];
        if ch.is_nan() {
            return result;
        }
        if ch > 0.0 {
            avg_gain += ch;
        } else {
            avg_loss -= ch;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    result[period] = rsi_from_averages(avg_gain, avg_loss);

    let p = period as f64;
    for i in (period + 1)..n {
        let ch = values[i] - values[i - 1];
        if ch.is_nan() {
            return result;
        }
        let gain = if ch > 0.0 { ch } else { 0.0 };
        let loss = if ch < 0.0 { -ch } else { 0.0 };

        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;

        result[i] = rsi_from_averages(avg_gain, avg_loss);
    }

    result
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rsi = 100.0 - 100.0 / (1.0 + avg_gain / avg_loss);
    rsi.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles};

    #[test]
    fn rsi_all_gains_is_100() {
        let result = rsi_of_series(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0], 3);
        assert_eq!(result[3], 100.0);
        assert_eq!(result[5], 100.0);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let result = rsi_of_series(&[105.0, 104.0, 103.0, 102.0, 101.0, 100.0], 3);
        assert_approx(result[3], 0.0, 1e-9);
    }

    #[test]
    fn rsi_flat_series_clamps_to_100() {
        let result = rsi_of_series(&[50.0; 8], 3);
        for v in &result[3..] {
            assert_eq!(*v, 100.0);
        }
    }

    #[test]
    fn rsi_mixed_seed_value() {
        // Changes: +0.34, -0.25, -0.48; avg_gain = 0.34/3, avg_loss = 0.73/3
        // RSI[3] = 100 - 100 / (1 + 0.34/0.73)
        let result = rsi_of_series(&[44.0, 44.34, 44.09, 43.61, 44.33], 3);
        assert!(result[0].is_nan());
        assert!(result[2].is_nan());
        let expected = 100.0 - 100.0 / (1.0 + 0.34 / 0.73);
        assert_approx(result[3], expected, 1e-9);
        // Wilder step: gain 0.72
        let g = (0.34 / 3.0 * 2.0 + 0.72) / 3.0;
        let l = (0.73 / 3.0 * 2.0) / 3.0;
        assert_approx(result[4], 100.0 - 100.0 / (1.0 + g / l), 1e-9);
    }

    #[test]
    fn rsi_bounds() {
        let result = rsi_of_series(&[100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0], 3);
        for (i, &v) in result.iter().enumerate() {
            if !v.is_nan() {
                assert!((0.0..=100.0).contains(&v), "RSI out of bounds at {i}: {v}");
            }
        }
    }

    #[test]
    fn rsi_too_short_is_all_nan() {
        assert!(rsi_of_series(&[1.0, 2.0, 3.0], 3).iter().all(|v| v.is_nan()));
        assert!(rsi_of_series(&[1.0, 2.0, 3.0], 0).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rsi_nan_in_seed_is_all_nan() {
        let result = rsi_of_series(&[100.0, 101.0, f64::NAN, 103.0, 104.0], 3);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rsi_indicator_lookback() {
        let rsi = Rsi::new(14);
        assert_eq!(rsi.lookback(), 14);
        assert_eq!(rsi.name(), "rsi_14");
        let out = Rsi::new(3).compute(&make_candles(&[1.0, 2.0, 3.0, 4.0]));
        assert_eq!(out[3], 100.0);
    }
}

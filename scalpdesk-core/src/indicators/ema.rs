//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = (close[t] - EMA[t-1]) * k + EMA[t-1], k = 2 / (period + 1)
//! Seed: EMA[period-1] = SMA of the first `period` values.
//! Lookback: period - 1.

use super::{closes, Indicator};
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        ema_of_series(&closes(candles), self.period)
    }
}

/// Compute EMA values from a pre-extracted f64 slice.
///
/// Returns all-NaN when the series is shorter than `period` or `period` is 0.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n < period || period == 0 {
        return result;
    }

    let k = 2.0 / (period as f64 + 1.0);

    // Seed: SMA of first `period` values
    let mut sum = 0.0;
    for &v in values.iter().take(period) {
        if v.is_nan() {
            return result;
        }
        sum += v;
    }
    let seed = sum / period as f64;
    result[period - 1] = seed;

    let mut prev = seed;
    for i in period..n {
        if values[i].is_nan() {
            // NaN taints everything after it
            return result;
        }
        let ema = (values[i] - prev) * k + prev;
        result[i] = ema;
        prev = ema;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles, DEFAULT_EPSILON};

    #[test]
    fn ema_period_1_equals_close() {
        let result = ema_of_series(&[100.0, 200.0, 300.0], 1);
        assert_approx(result[0], 100.0, DEFAULT_EPSILON);
        assert_approx(result[1], 200.0, DEFAULT_EPSILON);
        assert_approx(result[2], 300.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_3_of_one_to_five() {
        // k = 0.5, seed at index 2 = mean(1,2,3) = 2
        // [3] = (4-2)*0.5+2 = 3, [4] = (5-3)*0.5+3 = 4
        let result = ema_of_series(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 2.0, DEFAULT_EPSILON);
        assert_approx(result[3], 3.0, DEFAULT_EPSILON);
        assert_approx(result[4], 4.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_shorter_than_period_is_all_nan() {
        let result = ema_of_series(&[1.0, 2.0], 3);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ema_period_zero_is_all_nan() {
        assert!(ema_of_series(&[1.0, 2.0], 0).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ema_nan_in_seed_produces_all_nan() {
        let result = ema_of_series(&[10.0, f64::NAN, 12.0, 13.0, 14.0], 3);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ema_nan_after_seed_propagates() {
        let result = ema_of_series(&[10.0, 11.0, 12.0, f64::NAN, 14.0], 3);
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert!(result[3].is_nan());
        assert!(result[4].is_nan());
    }

    #[test]
    fn ema_indicator_matches_series() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let ema = Ema::new(3);
        assert_eq!(ema.name(), "ema_3");
        assert_eq!(ema.lookback(), 2);
        let from_candles = ema.compute(&candles);
        let from_series = ema_of_series(&closes(&candles), 3);
        for i in 2..6 {
            assert_approx(from_candles[i], from_series[i], DEFAULT_EPSILON);
        }
    }
}

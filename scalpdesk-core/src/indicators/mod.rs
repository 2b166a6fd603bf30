//! Indicator library: EMA, RSI and candlestick pattern predicates.
//!
//! Series indicators are pure functions from a price series to an output
//! series of the same length. Warmup positions hold `f64::NAN`; callers must
//! check `is_nan()` before comparing values.

pub mod ema;
pub mod patterns;
pub mod rsi;

pub use ema::{ema_of_series, Ema};
pub use patterns::{
    detect_patterns, is_bearish_engulfing, is_bullish_engulfing, is_hammer, is_shooting_star,
    CandlePattern,
};
pub use rsi::{rsi_of_series, Rsi};

use crate::domain::Candle;

/// Trait for series indicators computed over candle closes.
///
/// The output has the same length as the input and the first `lookback()`
/// values are `f64::NAN`. No value at index t may depend on candles after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_50", "rsi_14").
    fn name(&self) -> &str;

    /// Number of leading warmup positions.
    fn lookback(&self) -> usize;

    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Close prices of a candle slice.
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Create synthetic candles from close prices for testing.
///
/// open = previous close (or close for the first candle),
/// high = max(open, close) + 1.0, low = min(open, close) - 1.0, one minute apart.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle::new(
                60 * i as i64,
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

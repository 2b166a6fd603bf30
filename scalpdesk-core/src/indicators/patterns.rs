//! Candlestick pattern predicates.
//!
//! Pure functions of one or two candles. A candle with zero range never
//! matches a pattern.

use crate::domain::Candle;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandlePattern {
    Hammer,
    ShootingStar,
    BullishEngulfing,
    BearishEngulfing,
}

impl fmt::Display for CandlePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CandlePattern::Hammer => "hammer",
            CandlePattern::ShootingStar => "shooting star",
            CandlePattern::BullishEngulfing => "bullish engulfing",
            CandlePattern::BearishEngulfing => "bearish engulfing",
        };
        f.write_str(name)
    }
}

/// Long lower wick, small upper wick, range at least 3x the body.
pub fn is_hammer(c: &Candle) -> bool {
    let body = c.body();
    c.range() > 0.0
        && c.lower_wick() >= 2.0 * body
        && c.upper_wick() <= 0.5 * body
        && c.range() >= 3.0 * body
}

/// Mirror of the hammer: long upper wick, small lower wick.
pub fn is_shooting_star(c: &Candle) -> bool {
    let body = c.body();
    c.range() > 0.0
        && c.upper_wick() >= 2.0 * body
        && c.lower_wick() <= 0.5 * body
        && c.range() >= 3.0 * body
}

/// Bullish `curr` whose body covers the bearish `prev` body.
pub fn is_bullish_engulfing(curr: &Candle, prev: &Candle) -> bool {
    curr.is_bullish()
        && prev.is_bearish()
        && curr.open <= prev.close
        && curr.close >= prev.open
}

/// Bearish `curr` whose body covers the bullish `prev` body.
pub fn is_bearish_engulfing(curr: &Candle, prev: &Candle) -> bool {
    curr.is_bearish()
        && prev.is_bullish()
        && curr.open >= prev.close
        && curr.close <= prev.open
}

/// Every pattern formed by `curr` (and `prev`, for two-candle patterns).
pub fn detect_patterns(curr: &Candle, prev: Option<&Candle>) -> Vec<CandlePattern> {
    let mut found = Vec::new();
    if is_hammer(curr) {
        found.push(CandlePattern::Hammer);
    }
    if is_shooting_star(curr) {
        found.push(CandlePattern::ShootingStar);
    }
    if let Some(prev) = prev {
        if is_bullish_engulfing(curr, prev) {
            found.push(CandlePattern::BullishEngulfing);
        }
        if is_bearish_engulfing(curr, prev) {
            found.push(CandlePattern::BearishEngulfing);
        }
    }
    found
}

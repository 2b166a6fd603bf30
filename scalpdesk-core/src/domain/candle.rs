//! Candle: the fundamental market data unit.

use serde::{Deserialize, Serialize};

/// OHLC candle for one interval of the watched market.
///
/// `time` is the candle's open time in seconds since the Unix epoch. Within a
/// series, closed candles have strictly increasing `time`; only the newest
/// entry may still be forming.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Absolute distance between open and close.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// Full high-low range.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Basic OHLC sanity check: finite, positive, high/low bracket open and close.
    pub fn is_sane(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.open > 0.0
            && self.close > 0.0
            && self.low > 0.0
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
    }
}

/// A candle delivered by the market feed, tagged with its lifecycle stage.
///
/// `Provisional` candles may be revised in place by later updates with the
/// same `time`. A `Final` candle is closed history and never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "candle", rename_all = "snake_case")]
pub enum CandleUpdate {
    Provisional(Candle),
    Final(Candle),
}

impl CandleUpdate {
    pub fn candle(&self) -> &Candle {
        match self {
            CandleUpdate::Provisional(c) | CandleUpdate::Final(c) => c,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, CandleUpdate::Final(_))
    }
}

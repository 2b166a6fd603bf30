//! Feed normalisation.
//!
//! Exchange kline streams repeat the same open time while a candle is
//! forming and simply move on to a new time once it closes. The session
//! wants explicit stages, so `FeedNormalizer` tags each raw tick as
//! provisional and emits a `Final` for the previous candle when the time
//! advances.

use crate::domain::{Candle, CandleUpdate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Candle interval such as `"1m"` or `"4h"`.
///
/// Unknown or malformed labels resolve to 60 seconds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Timeframe {
    label: String,
    seconds: i64,
}

impl Timeframe {
    pub const FALLBACK_SECONDS: i64 = 60;

    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        Self {
            label: label.to_string(),
            seconds: seconds_of(label).unwrap_or(Self::FALLBACK_SECONDS),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Start of the candle containing `time`.
    pub fn align(&self, time: i64) -> i64 {
        time - time.rem_euclid(self.seconds)
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::parse("1m")
    }
}

impl From<String> for Timeframe {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.label
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

fn seconds_of(label: &str) -> Option<i64> {
    let unit = label.chars().last()?;
    let count: i64 = label[..label.len() - unit.len_utf8()].parse().ok()?;
    if count <= 0 {
        return None;
    }
    let per = match unit {
        'm' => 60,
        'h' => 3_600,
        'd' => 86_400,
        'w' => 604_800,
        _ => return None,
    };
    count.checked_mul(per)
}

/// Turns untagged kline ticks into `Provisional`/`Final` updates.
#[derive(Debug, Clone, Default)]
pub struct FeedNormalizer {
    current: Option<Candle>,
}

impl FeedNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candle currently forming, if any.
    pub fn current(&self) -> Option<&Candle> {
        self.current.as_ref()
    }

    /// Feed one raw tick.
    ///
    /// Same time as the forming candle: one `Provisional`. Newer time:
    /// `Final(previous)` then `Provisional(tick)`. Older time: nothing.
    pub fn push(&mut self, tick: Candle) -> Vec<CandleUpdate> {
        match self.current {
            Some(cur) if tick.time < cur.time => {
                tracing::debug!(tick = tick.time, forming = cur.time, "dropping out-of-order tick");
                Vec::new()
            }
            Some(cur) if tick.time > cur.time => {
                self.current = Some(tick);
                vec![CandleUpdate::Final(cur), CandleUpdate::Provisional(tick)]
            }
            _ => {
                self.current = Some(tick);
                vec![CandleUpdate::Provisional(tick)]
            }
        }
    }

    /// Close out the forming candle, e.g. at end of a recorded stream.
    pub fn flush(&mut self) -> Option<CandleUpdate> {
        self.current.take().map(CandleUpdate::Final)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(time: i64, close: f64) -> Candle {
        Candle::new(time, 100.0, close.max(100.0), close.min(100.0), close)
    }

    #[test]
    fn timeframe_parsing() {
        assert_eq!(Timeframe::parse("1m").seconds(), 60);
        assert_eq!(Timeframe::parse("15m").seconds(), 900);
        assert_eq!(Timeframe::parse("1h").seconds(), 3_600);
        assert_eq!(Timeframe::parse("4h").seconds(), 14_400);
        assert_eq!(Timeframe::parse("1d").seconds(), 86_400);
        assert_eq!(Timeframe::parse("1w").seconds(), 604_800);
    }

    #[test]
    fn unknown_timeframe_falls_back_to_a_minute() {
        for label in ["", "m", "1x", "abc", "-5m", "0h", "1M"] {
            assert_eq!(Timeframe::parse(label).seconds(), 60, "label {label:?}");
        }
        assert_eq!(Timeframe::parse("1x").label(), "1x");
    }

    #[test]
    fn timeframe_serde_is_a_plain_string() {
        let tf: Timeframe = serde_json::from_str("\"4h\"").unwrap();
        assert_eq!(tf.seconds(), 14_400);
        assert_eq!(serde_json::to_string(&tf).unwrap(), "\"4h\"");
    }

    #[test]
    fn align_floors_to_candle_start() {
        let tf = Timeframe::parse("15m");
        assert_eq!(tf.align(1_000), 900);
        assert_eq!(tf.align(900), 900);
    }

    #[test]
    fn repeated_time_is_provisional() {
        let mut feed = FeedNormalizer::new();
        assert_eq!(feed.push(tick(60, 101.0)), vec![CandleUpdate::Provisional(tick(60, 101.0))]);
        assert_eq!(feed.push(tick(60, 102.0)), vec![CandleUpdate::Provisional(tick(60, 102.0))]);
    }

    #[test]
    fn new_time_finalises_previous() {
        let mut feed = FeedNormalizer::new();
        feed.push(tick(60, 101.0));
        feed.push(tick(60, 102.0));
        let out = feed.push(tick(120, 99.0));
        assert_eq!(
            out,
            vec![
                CandleUpdate::Final(tick(60, 102.0)),
                CandleUpdate::Provisional(tick(120, 99.0)),
            ]
        );
    }

    #[test]
    fn older_tick_is_dropped() {
        let mut feed = FeedNormalizer::new();
        feed.push(tick(120, 101.0));
        assert!(feed.push(tick(60, 105.0)).is_empty());
        assert_eq!(feed.current().map(|c| c.close), Some(101.0));
    }

    #[test]
    fn flush_finalises_forming_candle() {
        let mut feed = FeedNormalizer::new();
        assert_eq!(feed.flush(), None);
        feed.push(tick(60, 101.0));
        assert_eq!(feed.flush(), Some(CandleUpdate::Final(tick(60, 101.0))));
        assert!(feed.current().is_none());
    }
}

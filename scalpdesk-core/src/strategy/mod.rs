//! Strategy engine: candle history in, one `Signal` out.
//!
//! `detect_signal` is pure and idempotent. It recomputes every indicator over
//! the supplied history on each call; histories are bounded (a few hundred
//! candles) so this stays cheap enough to run on every closed candle.

pub mod config;

pub use config::{DualRsiParams, StrategyConfig, StrategyRule, TrendPullbackParams};

use crate::domain::{Candle, Signal, SignalKind};
use crate::indicators::{closes, detect_patterns, ema_of_series, rsi_of_series};

pub const REASON_INSUFFICIENT_DATA: &str = "insufficient data";
pub const REASON_WARMING_UP: &str = "indicators warming up";
pub const REASON_NO_SIGNAL: &str = "no signal";

/// Evaluate the configured rule set against the newest candle of `history`.
///
/// Histories shorter than `config.min_history` yield NEUTRAL at price 0 and
/// time 0. Indicators still in warmup yield NEUTRAL at the last close.
pub fn detect_signal(history: &[Candle], config: &StrategyConfig) -> Signal {
    if history.len() < config.min_history {
        return Signal::neutral(0.0, 0, REASON_INSUFFICIENT_DATA);
    }
    let Some(last) = history.last() else {
        return Signal::neutral(0.0, 0, REASON_INSUFFICIENT_DATA);
    };

    let mut signal = match &config.rule {
        StrategyRule::TrendPullback(p) => trend_pullback(history, p),
        StrategyRule::DualRsi(p) => dual_rsi(history, p),
    };

    let prev = history.len().checked_sub(2).map(|i| &history[i]);
    let patterns = detect_patterns(last, prev);
    if !patterns.is_empty() {
        let names: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        signal.reason = format!("{} [{}]", signal.reason, names.join(", "));
    }
    signal
}

fn trend_pullback(history: &[Candle], p: &TrendPullbackParams) -> Signal {
    let closes = closes(history);
    let n = closes.len();
    let last_close = closes[n - 1];
    let time = history[n - 1].time;

    let fast = last_of(&ema_of_series(&closes, p.trend_fast));
    let slow = last_of(&ema_of_series(&closes, p.trend_slow));
    let momentum = last_of(&ema_of_series(&closes, p.momentum_period));
    let rsi = rsi_of_series(&closes, p.rsi_period);
    let prev_rsi = if n >= 2 { rsi[n - 2] } else { f64::NAN };

    if [fast, slow, momentum, prev_rsi].iter().any(|v| v.is_nan()) {
        return Signal::neutral(last_close, time, REASON_WARMING_UP);
    }

    let uptrend = fast > slow;
    let downtrend = fast < slow;

    if uptrend && prev_rsi < p.rsi_oversold && last_close > momentum {
        return Signal {
            kind: SignalKind::Long,
            price: last_close,
            time,
            reason: format!(
                "EMA{} > EMA{} & prev RSI{} {:.2} < {} & close > EMA{}",
                p.trend_fast, p.trend_slow, p.rsi_period, prev_rsi, p.rsi_oversold, p.momentum_period
            ),
        };
    }

    if downtrend && prev_rsi > p.rsi_overbought && last_close < momentum {
        return Signal {
            kind: SignalKind::Short,
            price: last_close,
            time,
            reason: format!(
                "EMA{} < EMA{} & prev RSI{} {:.2} > {} & close < EMA{}",
                p.trend_fast,
                p.trend_slow,
                p.rsi_period,
                prev_rsi,
                p.rsi_overbought,
                p.momentum_period
            ),
        };
    }

    Signal::neutral(last_close, time, REASON_NO_SIGNAL)
}

fn dual_rsi(history: &[Candle], p: &DualRsiParams) -> Signal {
    let closes = closes(history);
    let n = closes.len();
    let last_close = closes[n - 1];
    let time = history[n - 1].time;

    let ema_fast = last_of(&ema_of_series(&closes, p.ema_fast));
    let ema_slow = last_of(&ema_of_series(&closes, p.ema_slow));
    let rsi_fast = last_of(&rsi_of_series(&closes, p.rsi_fast));
    let rsi_slow = last_of(&rsi_of_series(&closes, p.rsi_slow));

    if [ema_fast, ema_slow, rsi_fast, rsi_slow].iter().any(|v| v.is_nan()) {
        return Signal::neutral(last_close, time, REASON_WARMING_UP);
    }

    if ema_fast > ema_slow && rsi_fast > rsi_slow && last_close > ema_fast {
        return Signal {
            kind: SignalKind::Long,
            price: last_close,
            time,
            reason: format!(
                "EMA{} > EMA{} & RSI{} > RSI{}",
                p.ema_fast, p.ema_slow, p.rsi_fast, p.rsi_slow
            ),
        };
    }

    if ema_fast < ema_slow && rsi_fast < rsi_slow && last_close < ema_fast {
        return Signal {
            kind: SignalKind::Short,
            price: last_close,
            time,
            reason: format!(
                "EMA{} < EMA{} & RSI{} < RSI{}",
                p.ema_fast, p.ema_slow, p.rsi_fast, p.rsi_slow
            ),
        };
    }

    Signal::neutral(last_close, time, REASON_NO_SIGNAL)
}

fn last_of(series: &[f64]) -> f64 {
    series.last().copied().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;

    fn small_trend_config(oversold: f64, overbought: f64) -> StrategyConfig {
        StrategyConfig {
            min_history: 10,
            rule: StrategyRule::TrendPullback(TrendPullbackParams {
                trend_fast: 3,
                trend_slow: 6,
                momentum_period: 2,
                rsi_period: 3,
                rsi_oversold: oversold,
                rsi_overbought: overbought,
            }),
        }
    }

    #[test]
    fn short_history_is_insufficient() {
        let candles = make_candles(&vec![100.0; 80]);
        let sig = detect_signal(&candles, &StrategyConfig::default());
        assert_eq!(sig.kind, SignalKind::Neutral);
        assert_eq!(sig.price, 0.0);
        assert_eq!(sig.time, 0);
        assert_eq!(sig.reason, REASON_INSUFFICIENT_DATA);
    }

    #[test]
    fn empty_history_is_insufficient_even_with_zero_minimum() {
        let cfg = StrategyConfig {
            min_history: 0,
            ..Default::default()
        };
        assert_eq!(detect_signal(&[], &cfg).reason, REASON_INSUFFICIENT_DATA);
    }

    #[test]
    fn long_trend_not_warmed_up_is_neutral_at_last_close() {
        // 150 candles: enough history, but EMA200 still undefined.
        let closes: Vec<f64> = (0..150).map(|i| 100.0 + i as f64 * 0.1).collect();
        let candles = make_candles(&closes);
        let sig = detect_signal(&candles, &StrategyConfig::default());
        assert_eq!(sig.kind, SignalKind::Neutral);
        assert_eq!(sig.reason, REASON_WARMING_UP);
        assert_eq!(sig.price, *closes.last().unwrap());
    }

    #[test]
    fn uptrend_dip_then_recovery_is_long() {
        // Steady uptrend, a sharp two-bar dip, then a bounce above the short EMA.
        let mut closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        closes.push(110.0);
        closes.push(125.0);
        let candles = make_candles(&closes);
        let sig = detect_signal(&candles, &small_trend_config(45.0, 55.0));
        assert_eq!(sig.kind, SignalKind::Long, "reason: {}", sig.reason);
        assert_eq!(sig.price, 125.0);
        assert!(sig.reason.starts_with("EMA3 > EMA6"));
    }

    #[test]
    fn downtrend_rally_then_drop_is_short() {
        let mut closes: Vec<f64> = (0..20).map(|i| 200.0 - i as f64).collect();
        closes.push(190.0);
        closes.push(175.0);
        let candles = make_candles(&closes);
        let sig = detect_signal(&candles, &small_trend_config(45.0, 55.0));
        assert_eq!(sig.kind, SignalKind::Short, "reason: {}", sig.reason);
        assert!(sig.reason.starts_with("EMA3 < EMA6"));
    }

    #[test]
    fn steady_uptrend_without_dip_is_neutral() {
        // Monotonic gains keep RSI at 100, never oversold.
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let sig = detect_signal(&make_candles(&closes), &small_trend_config(45.0, 55.0));
        assert_eq!(sig.kind, SignalKind::Neutral);
        assert!(sig.reason.starts_with(REASON_NO_SIGNAL));
    }

    #[test]
    fn detection_is_idempotent() {
        let mut closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        closes.push(110.0);
        closes.push(125.0);
        let candles = make_candles(&closes);
        let cfg = small_trend_config(45.0, 55.0);
        assert_eq!(detect_signal(&candles, &cfg), detect_signal(&candles, &cfg));
    }

    #[test]
    fn dual_rsi_long_in_rising_market() {
        let cfg = StrategyConfig {
            min_history: 10,
            rule: StrategyRule::DualRsi(DualRsiParams {
                ema_fast: 3,
                ema_slow: 6,
                rsi_fast: 3,
                rsi_slow: 8,
            }),
        };
        // Choppy rise, then a strong final push keeps the fast RSI above the slow one.
        let mut closes = Vec::new();
        for i in 0..20 {
            let base = 100.0 + i as f64;
            closes.push(if i % 2 == 0 { base } else { base - 1.5 });
        }
        closes.push(125.0);
        closes.push(128.0);
        let sig = detect_signal(&make_candles(&closes), &cfg);
        assert_eq!(sig.kind, SignalKind::Long, "reason: {}", sig.reason);
        assert_eq!(sig.reason, "EMA3 > EMA6 & RSI3 > RSI8");
    }

    #[test]
    fn reason_lists_detected_patterns() {
        let mut candles = make_candles(&(0..12).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
        let t = candles.last().unwrap().time + 60;
        // hammer: body 1, lower wick 3, upper wick 0.25
        candles.push(Candle::new(t, 110.0, 111.25, 107.0, 111.0));
        let cfg = small_trend_config(45.0, 55.0);
        let sig = detect_signal(&candles, &cfg);
        assert!(sig.reason.ends_with("[hammer]"), "reason: {}", sig.reason);
    }
}

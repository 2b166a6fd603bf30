//! Offline backtest of the trend-pullback rules.
//!
//! Replays a candle batch once, in order, holding at most one position. Uses
//! the same entry rule parameters as the live strategy and the same TP/SL
//! evaluation as the position manager, but keeps no live state: no balance,
//! no leverage, PnL in unlevered percent.

use crate::domain::{Candle, ExitReason, Side, TradeOutcome};
use crate::error::{require_fraction, ConfigError};
use crate::indicators::{Ema, Indicator, Rsi};
use crate::position::exit_trigger;
use crate::strategy::TrendPullbackParams;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Batches shorter than this produce an empty result.
    pub min_candles: usize,
    /// Stop once this many trades have closed.
    pub max_trades: usize,
    pub tp_pct: f64,
    pub sl_pct: f64,
    /// Candles to sit out after each close.
    pub cooldown_candles: u32,
    pub rules: TrendPullbackParams,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            min_candles: 250,
            max_trades: 50,
            tp_pct: 0.003,
            sl_pct: 0.001,
            cooldown_candles: 15,
            rules: TrendPullbackParams::default(),
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_fraction("tp_pct", self.tp_pct)?;
        require_fraction("sl_pct", self.sl_pct)?;
        self.rules.validate()
    }
}

/// One simulated round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestTrade {
    pub entry_time: i64,
    pub exit_time: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub side: Side,
    /// Unlevered percent move in the trade's favour.
    pub pnl: f64,
    /// WIN when the take-profit was hit, LOSS when the stop-loss was hit.
    pub result: TradeOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Percent of trades that hit the take-profit.
    pub win_rate: f64,
    pub trades: Vec<BacktestTrade>,
}

impl BacktestResult {
    fn from_trades(trades: Vec<BacktestTrade>) -> Self {
        let wins = trades
            .iter()
            .filter(|t| t.result == TradeOutcome::Win)
            .count();
        let total = trades.len();
        Self {
            total_trades: total,
            wins,
            losses: total - wins,
            win_rate: if total > 0 {
                wins as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            trades,
        }
    }

    /// Sum of per-trade percent moves.
    pub fn total_pnl_pct(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl).sum()
    }
}

struct OpenTrade {
    side: Side,
    entry_price: f64,
    entry_time: i64,
    tp: f64,
    sl: f64,
}

/// Replay `candles` through the trend-pullback rules.
pub fn run_backtest(candles: &[Candle], config: &BacktestConfig) -> BacktestResult {
    if candles.len() < config.min_candles || candles.is_empty() {
        return BacktestResult::default();
    }

    let p = &config.rules;
    let ema_fast = Ema::new(p.trend_fast).compute(candles);
    let ema_slow = Ema::new(p.trend_slow).compute(candles);
    let ema_momentum = Ema::new(p.momentum_period).compute(candles);
    let rsi = Rsi::new(p.rsi_period).compute(candles);

    // First index where the slow trend and the previous-bar RSI both exist.
    let start = p.trend_slow.max(p.rsi_period + 1).max(1);

    let mut trades = Vec::new();
    let mut open: Option<OpenTrade> = None;
    let mut cooldown: u32 = 0;

    for i in start..candles.len() {
        if trades.len() >= config.max_trades {
            break;
        }
        let candle = &candles[i];

        cooldown = cooldown.saturating_sub(1);

        if let Some(pos) = &open {
            if let Some(trigger) = exit_trigger(pos.side, pos.tp, pos.sl, candle) {
                let pnl = (trigger.price - pos.entry_price) / pos.entry_price * 100.0 * pos.side.sign();
                let result = match trigger.reason {
                    ExitReason::TakeProfit => TradeOutcome::Win,
                    _ => TradeOutcome::Loss,
                };
                trades.push(BacktestTrade {
                    entry_time: pos.entry_time,
                    exit_time: candle.time,
                    entry_price: pos.entry_price,
                    exit_price: trigger.price,
                    side: pos.side,
                    pnl,
                    result,
                });
                open = None;
                cooldown = config.cooldown_candles;
            }
        }

        if open.is_some() || cooldown > 0 {
            continue;
        }

        let (fast, slow, momentum, prev_rsi) =
            (ema_fast[i], ema_slow[i], ema_momentum[i], rsi[i - 1]);
        if [fast, slow, momentum, prev_rsi].iter().any(|v| v.is_nan()) {
            continue;
        }

        let side = if fast > slow && prev_rsi < p.rsi_oversold && candle.close > momentum {
            Some(Side::Long)
        } else if fast < slow && prev_rsi > p.rsi_overbought && candle.close < momentum {
            Some(Side::Short)
        } else {
            None
        };

        if let Some(side) = side {
            let entry = candle.close;
            let (tp, sl) = match side {
                Side::Long => (entry * (1.0 + config.tp_pct), entry * (1.0 - config.sl_pct)),
                Side::Short => (entry * (1.0 - config.tp_pct), entry * (1.0 + config.sl_pct)),
            };
            open = Some(OpenTrade {
                side,
                entry_price: entry,
                entry_time: candle.time,
                tp,
                sl,
            });
        }
    }

    let result = BacktestResult::from_trades(trades);
    tracing::debug!(
        candles = candles.len(),
        trades = result.total_trades,
        win_rate = result.win_rate,
        "backtest complete"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> BacktestConfig {
        BacktestConfig {
            min_candles: 10,
            max_trades: 50,
            tp_pct: 0.01,
            sl_pct: 0.005,
            cooldown_candles: 2,
            rules: TrendPullbackParams {
                trend_fast: 3,
                trend_slow: 6,
                momentum_period: 2,
                rsi_period: 3,
                rsi_oversold: 45.0,
                rsi_overbought: 55.0,
            },
        }
    }

    /// Rising market with a two-bar pullback every `cycle` bars.
    fn sawtooth_uptrend(n: usize, cycle: usize) -> Vec<f64> {
        let mut closes = Vec::with_capacity(n);
        let mut price = 100.0;
        for i in 0..n {
            match i % cycle {
                k if k == cycle - 3 || k == cycle - 2 => price *= 0.985,
                _ => price *= 1.012,
            }
            closes.push(price);
        }
        closes
    }

    /// Candles with 0.05% wicks so exits are decided by the close-to-close move.
    fn tight_candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let open = if i == 0 { close } else { closes[i - 1] };
                Candle::new(
                    60 * i as i64,
                    open,
                    open.max(close) * 1.0005,
                    open.min(close) * 0.9995,
                    close,
                )
            })
            .collect()
    }

    #[test]
    fn too_few_candles_is_zeroed() {
        let candles = tight_candles(&vec![100.0; 249]);
        let result = run_backtest(&candles, &BacktestConfig::default());
        assert_eq!(result, BacktestResult::default());
    }

    #[test]
    fn enters_on_the_bounce_and_exits_at_take_profit() {
        let candles = tight_candles(&sawtooth_uptrend(60, 8));
        let cfg = small_config();
        let result = run_backtest(&candles, &cfg);
        assert_eq!(result.total_trades, 7);
        assert_eq!(result.wins, 7);
        assert_eq!(result.losses, 0);
        assert_eq!(result.win_rate, 100.0);

        let first = &result.trades[0];
        assert_eq!(first.side, Side::Long);
        assert_eq!(first.entry_time, 7 * 60);
        assert_eq!(first.exit_time, 8 * 60);
        assert_eq!(first.entry_price, candles[7].close);
        assert!((first.exit_price - first.entry_price * 1.01).abs() < 1e-9);
        assert!((first.pnl - 1.0).abs() < 1e-9);
        assert_eq!(first.result, TradeOutcome::Win);
    }

    #[test]
    fn stops_at_max_trades() {
        let candles = tight_candles(&sawtooth_uptrend(200, 8));
        let mut cfg = small_config();
        let unlimited = run_backtest(&candles, &cfg);
        assert_eq!(unlimited.total_trades, 24);
        cfg.max_trades = 2;
        let capped = run_backtest(&candles, &cfg);
        assert_eq!(capped.total_trades, 2);
        assert_eq!(capped.trades[..], unlimited.trades[..2]);
    }

    #[test]
    fn cooldown_spaces_out_entries() {
        let candles = tight_candles(&sawtooth_uptrend(200, 8));
        let cfg = small_config();
        let trades = run_backtest(&candles, &cfg).trades;
        for pair in trades.windows(2) {
            let gap_candles = (pair[1].entry_time - pair[0].exit_time) / 60;
            assert!(gap_candles >= cfg.cooldown_candles as i64, "gap {gap_candles}");
        }
    }

    #[test]
    fn both_levels_in_one_candle_is_a_loss() {
        let mut candles = tight_candles(&sawtooth_uptrend(60, 8));
        let cfg = small_config();
        let entry = candles[7].close;
        // Exit candle spans both the take-profit and the stop-loss.
        candles[8] = Candle::new(8 * 60, entry, entry * 1.02, entry * 0.99, entry);
        let replay = run_backtest(&candles, &cfg);
        let first = &replay.trades[0];
        assert_eq!(first.result, TradeOutcome::Loss);
        assert_eq!(first.exit_time, 8 * 60);
        assert!((first.exit_price - entry * 0.995).abs() < 1e-9);
        assert!((first.pnl + 0.5).abs() < 1e-9);
        assert_eq!(replay.losses, 1);
    }

    #[test]
    fn default_config_is_valid() {
        assert!(BacktestConfig::default().validate().is_ok());
    }
}

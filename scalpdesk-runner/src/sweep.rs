//! Parameter sweep over backtest thresholds.

use rayon::prelude::*;
use scalpdesk_core::backtest::{run_backtest, BacktestConfig};
use scalpdesk_core::domain::Candle;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Values to try for each swept parameter. Everything else comes from the
/// base config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub rsi_oversold: Vec<f64>,
    pub rsi_overbought: Vec<f64>,
    pub tp_pct: Vec<f64>,
    pub sl_pct: Vec<f64>,
}

impl Default for ParamGrid {
    /// 3 × 3 thresholds around 45/55, 3 × 3 exits around 0.3%/0.1%.
    fn default() -> Self {
        Self {
            rsi_oversold: vec![40.0, 45.0, 50.0],
            rsi_overbought: vec![50.0, 55.0, 60.0],
            tp_pct: vec![0.002, 0.003, 0.005],
            sl_pct: vec![0.001, 0.0015, 0.002],
        }
    }
}

impl ParamGrid {
    /// Upper bound on the number of configurations, before pruning.
    pub fn size(&self) -> usize {
        self.rsi_oversold.len() * self.rsi_overbought.len() * self.tp_pct.len() * self.sl_pct.len()
    }

    /// Every valid combination applied on top of `base`.
    ///
    /// Combinations with oversold above overbought, or that otherwise fail
    /// validation, are skipped.
    pub fn generate_configs(&self, base: &BacktestConfig) -> Vec<BacktestConfig> {
        let mut configs = Vec::new();
        for &oversold in &self.rsi_oversold {
            for &overbought in &self.rsi_overbought {
                if oversold > overbought {
                    continue;
                }
                for &tp in &self.tp_pct {
                    for &sl in &self.sl_pct {
                        let mut config = base.clone();
                        config.rules.rsi_oversold = oversold;
                        config.rules.rsi_overbought = overbought;
                        config.tp_pct = tp;
                        config.sl_pct = sl;
                        if config.validate().is_ok() {
                            configs.push(config);
                        }
                    }
                }
            }
        }
        configs
    }
}

/// Summary of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub tp_pct: f64,
    pub sl_pct: f64,
    pub total_trades: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub total_pnl_pct: f64,
}

/// Run every grid point in parallel.
///
/// Sorted by win rate, then trade count, then PnL, all descending. Points
/// that produced no trades sort last.
pub fn run_sweep(candles: &[Candle], grid: &ParamGrid, base: &BacktestConfig) -> Vec<SweepEntry> {
    let configs = grid.generate_configs(base);
    tracing::info!(
        configs = configs.len(),
        candles = candles.len(),
        "starting sweep"
    );

    let mut entries: Vec<SweepEntry> = configs
        .par_iter()
        .map(|config| {
            let result = run_backtest(candles, config);
            SweepEntry {
                rsi_oversold: config.rules.rsi_oversold,
                rsi_overbought: config.rules.rsi_overbought,
                tp_pct: config.tp_pct,
                sl_pct: config.sl_pct,
                total_trades: result.total_trades,
                wins: result.wins,
                win_rate: result.win_rate,
                total_pnl_pct: result.total_pnl_pct(),
            }
        })
        .collect();

    entries.sort_by(rank);
    entries
}

fn rank(a: &SweepEntry, b: &SweepEntry) -> Ordering {
    b.win_rate
        .total_cmp(&a.win_rate)
        .then_with(|| b.total_trades.cmp(&a.total_trades))
        .then_with(|| b.total_pnl_pct.total_cmp(&a.total_pnl_pct))
}

//! Backtest reports with a content-addressed run id.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use scalpdesk_core::backtest::{run_backtest, BacktestConfig, BacktestResult};
use scalpdesk_core::domain::Candle;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::data_loader::dataset_hash;

/// Bumped when the report layout changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub schema_version: u32,
    /// BLAKE3 over the config and the dataset; identical inputs, identical id.
    pub run_id: String,
    pub dataset_hash: String,
    pub candle_count: usize,
    pub first_time: Option<i64>,
    pub last_time: Option<i64>,
    pub config: BacktestConfig,
    pub result: BacktestResult,
    pub total_pnl_pct: f64,
    pub generated_at: DateTime<Utc>,
}

/// Deterministic id for a (config, dataset) pair.
pub fn run_id(config: &BacktestConfig, dataset_hash: &str) -> Result<String> {
    let json = serde_json::to_string(config).context("failed to serialize backtest config")?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(json.as_bytes());
    hasher.update(dataset_hash.as_bytes());
    Ok(hasher.finalize().to_hex().to_string())
}

impl BacktestReport {
    /// Run the backtest and wrap the result with provenance.
    pub fn run(candles: &[Candle], config: &BacktestConfig) -> Result<Self> {
        let dataset_hash = dataset_hash(candles);
        let run_id = run_id(config, &dataset_hash)?;
        let result = run_backtest(candles, config);
        if candles.len() < config.min_candles {
            tracing::warn!(
                candles = candles.len(),
                required = config.min_candles,
                "not enough candles, result is empty"
            );
        }
        tracing::info!(
            run_id = %&run_id[..12],
            trades = result.total_trades,
            win_rate = result.win_rate,
            "backtest finished"
        );
        Ok(Self {
            schema_version: SCHEMA_VERSION,
            run_id,
            dataset_hash,
            candle_count: candles.len(),
            first_time: candles.first().map(|c| c.time),
            last_time: candles.last().map(|c| c.time),
            config: config.clone(),
            total_pnl_pct: result.total_pnl_pct(),
            result,
            generated_at: Utc::now(),
        })
    }

    /// Plain-text summary for the terminal.
    pub fn render_text(&self) -> String {
        let r = &self.result;
        let mut out = String::new();
        let _ = writeln!(out, "run      {}", &self.run_id[..16.min(self.run_id.len())]);
        let _ = writeln!(out, "candles  {}", self.candle_count);
        let _ = writeln!(
            out,
            "trades   {} ({} wins / {} losses)",
            r.total_trades, r.wins, r.losses
        );
        let _ = writeln!(out, "win rate {:.2}%", r.win_rate);
        let _ = writeln!(out, "pnl      {:+.3}%", self.total_pnl_pct);
        out
    }
}

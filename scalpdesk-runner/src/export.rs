//! Export: ledger trades and backtest trades as CSV, stats and reports as JSON.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use scalpdesk_core::backtest::BacktestTrade;
use scalpdesk_core::domain::Trade;
use scalpdesk_core::position::Stats;

use crate::report::{BacktestReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_report_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a report, rejecting unknown schema versions.
pub fn import_report_json(json: &str) -> Result<BacktestReport> {
    let report: BacktestReport =
        serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

pub fn export_stats_json(stats: &Stats) -> Result<String> {
    serde_json::to_string_pretty(stats).context("failed to serialize Stats to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Ledger trades, in the order given (most recent first for a ledger).
///
/// Columns: id, side, entry_price, exit_price, size, leverage, pnl,
/// opened_at, closed_at, reason
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "id",
        "side",
        "entry_price",
        "exit_price",
        "size",
        "leverage",
        "pnl",
        "opened_at",
        "closed_at",
        "reason",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.id.to_string(),
            &t.side.to_string(),
            &format!("{:.6}", t.entry_price),
            &format!("{:.6}", t.exit_price),
            &format!("{:.2}", t.size),
            &format!("{:.2}", t.leverage),
            &format!("{:.2}", t.pnl),
            &t.opened_at.to_string(),
            &t.closed_at.to_string(),
            &t.reason.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Backtest trades in execution order.
///
/// Columns: entry_time, exit_time, side, entry_price, exit_price, pnl_pct, result
pub fn export_backtest_trades_csv(trades: &[BacktestTrade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_time",
        "exit_time",
        "side",
        "entry_price",
        "exit_price",
        "pnl_pct",
        "result",
    ])?;
    for t in trades {
        wtr.write_record([
            &t.entry_time.to_string(),
            &t.exit_time.to_string(),
            &t.side.to_string(),
            &format!("{:.6}", t.entry_price),
            &format!("{:.6}", t.exit_price),
            &format!("{:.4}", t.pnl),
            &t.result.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `report.json` and `trades.csv` under `output_dir/<run_id prefix>/`.
///
/// Returns the created directory.
pub fn save_artifacts(report: &BacktestReport, output_dir: &Path) -> Result<PathBuf> {
    let prefix_len = 12.min(report.run_id.len());
    let run_dir = output_dir.join(&report.run_id[..prefix_len]);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_report_json(report)?)?;
    std::fs::write(
        run_dir.join("trades.csv"),
        export_backtest_trades_csv(&report.result.trades)?,
    )?;

    Ok(run_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalpdesk_core::domain::{ExitReason, Side, TradeId, TradeOutcome};

    fn ledger_trade() -> Trade {
        Trade {
            id: TradeId(7),
            side: Side::Long,
            entry_price: 100.0,
            exit_price: 100.25,
            size: 1000.0,
            leverage: 20.0,
            pnl: 50.0,
            opened_at: 60,
            closed_at: 120,
            reason: ExitReason::TakeProfit,
        }
    }

    #[test]
    fn trades_csv_has_header_and_rows() {
        let csv = export_trades_csv(&[ledger_trade()]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("id,side,entry_price"));
        assert_eq!(
            lines[1],
            "T7,LONG,100.000000,100.250000,1000.00,20.00,50.00,60,120,TP HIT"
        );
    }

    #[test]
    fn backtest_csv_labels_results() {
        let trade = BacktestTrade {
            entry_time: 60,
            exit_time: 120,
            entry_price: 100.0,
            exit_price: 99.9,
            side: Side::Long,
            pnl: -0.1,
            result: TradeOutcome::Loss,
        };
        let csv = export_backtest_trades_csv(&[trade]).unwrap();
        assert!(csv.lines().nth(1).unwrap().ends_with(",-0.1000,LOSS"));
    }

    #[test]
    fn future_schema_is_rejected() {
        let candles = crate::data_loader::generate_synthetic(10, &Default::default());
        let mut report =
            BacktestReport::run(&candles, &scalpdesk_core::backtest::BacktestConfig::default())
                .unwrap();
        report.schema_version = SCHEMA_VERSION + 1;
        let json = export_report_json(&report).unwrap();
        assert!(import_report_json(&json).is_err());
    }

    #[test]
    fn artifacts_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let candles = crate::data_loader::generate_synthetic(10, &Default::default());
        let report =
            BacktestReport::run(&candles, &scalpdesk_core::backtest::BacktestConfig::default())
                .unwrap();
        let run_dir = save_artifacts(&report, dir.path()).unwrap();
        assert!(run_dir.join("report.json").exists());
        assert!(run_dir.join("trades.csv").exists());
        let back = import_report_json(&std::fs::read_to_string(run_dir.join("report.json")).unwrap())
            .unwrap();
        assert_eq!(back.run_id, report.run_id);
    }
}

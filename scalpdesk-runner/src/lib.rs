//! ScalpDesk Runner: configuration, data, persistence, replay and sweeps.
//!
//! This crate builds on `scalpdesk-core` to provide:
//! - TOML application config with per-section defaults
//! - CSV candle loading and a seeded synthetic feed
//! - A JSON-file key-value store for ledger persistence
//! - Replay of recorded candles through the session driver
//! - Parallel threshold sweeps and backtest reports with stable run ids
//! - CSV/JSON export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod persistence;
pub mod replay;
pub mod report;
pub mod sweep;

pub use config::{AppConfig, AppConfigError};
pub use data_loader::{
    dataset_hash, generate_synthetic, load_candles_csv, parse_candles_csv, DataError,
    SyntheticOptions,
};
pub use export::{
    export_backtest_trades_csv, export_report_json, export_stats_json, export_trades_csv,
    import_report_json, save_artifacts,
};
pub use persistence::JsonFileStore;
pub use replay::{replay, split_into_ticks, ReplayOptions};
pub use report::{run_id, BacktestReport, SCHEMA_VERSION};
pub use sweep::{run_sweep, ParamGrid, SweepEntry};

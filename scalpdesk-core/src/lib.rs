//! ScalpDesk Core: signal detection and simulated position lifecycle.
//!
//! This crate contains the trading logic, with no I/O:
//! - Domain types (candles, signals, positions, trades)
//! - EMA/RSI indicators and candlestick pattern recognizers
//! - Strategy engine turning candle history into LONG/SHORT/NEUTRAL signals
//! - Position manager with TP/SL exits, cooldown and a bounded trade ledger
//! - Offline backtest of the trend-pullback rules
//! - Session orchestration with epoch-guarded feed events, plus a
//!   single-consumer driver thread

pub mod backtest;
pub mod domain;
pub mod driver;
pub mod error;
pub mod feed;
pub mod indicators;
pub mod position;
pub mod session;
pub mod strategy;

pub use error::ConfigError;

//! Trade: an immutable record of a closed position.

use super::ids::TradeId;
use super::position::Side;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    #[serde(rename = "TP HIT")]
    TakeProfit,
    #[serde(rename = "SL HIT")]
    StopLoss,
    #[serde(rename = "MANUAL")]
    Manual,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::TakeProfit => f.write_str("TP HIT"),
            ExitReason::StopLoss => f.write_str("SL HIT"),
            ExitReason::Manual => f.write_str("MANUAL"),
        }
    }
}

/// A complete round trip: open → close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,
    pub leverage: f64,
    /// Realized PnL in quote currency.
    pub pnl: f64,
    pub opened_at: i64,
    pub closed_at: i64,
    pub reason: ExitReason,
}

/// Win/loss label used by ledger statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeOutcome {
    Win,
    Loss,
}

impl fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeOutcome::Win => f.write_str("WIN"),
            TradeOutcome::Loss => f.write_str("LOSS"),
        }
    }
}

impl Trade {
    /// A trade wins only with strictly positive PnL; break-even counts as a loss.
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn outcome(&self) -> TradeOutcome {
        if self.is_winner() {
            TradeOutcome::Win
        } else {
            TradeOutcome::Loss
        }
    }

    /// Return on committed margin, as a fraction.
    pub fn return_on_margin(&self) -> f64 {
        if self.size == 0.0 {
            return 0.0;
        }
        self.pnl / self.size
    }
}

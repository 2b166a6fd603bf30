//! Position: the single open simulated leveraged position.

use super::ids::PositionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a position or entry signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("LONG"),
            Side::Short => f.write_str("SHORT"),
        }
    }
}

/// An open simulated position.
///
/// `pnl` is the unrealized PnL at the last mark-to-market; every other field
/// is fixed at open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub side: Side,
    pub entry_price: f64,
    /// Notional margin committed, in quote currency.
    pub size: f64,
    pub leverage: f64,
    pub tp: f64,
    pub sl: f64,
    pub opened_at: i64,
    pub pnl: f64,
}

impl Position {
    /// PnL of this position if it were valued at `price`.
    ///
    /// Pure function of entry and price so repeated marks never drift.
    pub fn pnl_at(&self, price: f64) -> f64 {
        leveraged_pnl(self.side, self.entry_price, price, self.size, self.leverage)
    }
}

/// `size * leverage * signed percent move` from `entry` to `price`.
pub fn leveraged_pnl(side: Side, entry: f64, price: f64, size: f64, leverage: f64) -> f64 {
    if entry == 0.0 {
        return 0.0;
    }
    let move_frac = (price - entry) / entry * side.sign();
    size * leverage * move_frac
}

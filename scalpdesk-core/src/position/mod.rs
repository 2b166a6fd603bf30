//! Position manager: the FLAT/OPEN state machine of the single simulated position.
//!
//! Transitions that are invalid for the current state (open while OPEN or
//! cooling down, close while FLAT) return a `TransitionError` and leave every
//! field untouched. Upstream event ordering cannot guarantee strict
//! FLAT/OPEN alternation, so callers are expected to log and carry on.

pub mod config;
pub mod ledger;

pub use config::PositionConfig;
pub use ledger::{Ledger, Stats, RECENT_RESULTS};

use crate::domain::{leveraged_pnl, Candle, ExitReason, IdGen, Position, Side, Trade};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("a {side} position is already open")]
    AlreadyOpen { side: Side },

    #[error("entries blocked for {remaining} more closed candle(s)")]
    CoolingDown { remaining: u32 },

    #[error("no position is open")]
    NotOpen,

    #[error("price must be finite and positive (got {0})")]
    InvalidPrice(f64),

    #[error("position ids exhausted")]
    IdsExhausted,
}

/// A take-profit or stop-loss level crossed by a candle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitTrigger {
    /// The crossed level; the simulated fill price.
    pub price: f64,
    pub reason: ExitReason,
}

/// The persisted subset of manager state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub balance: f64,
    /// Most recent first.
    pub trades: Vec<Trade>,
}

/// Owns the single optional position, the cooldown counter, the balance and
/// the trade ledger.
#[derive(Debug, Clone)]
pub struct PositionManager {
    config: PositionConfig,
    position: Option<Position>,
    ledger: Ledger,
    balance: f64,
    cooldown: u32,
    id_gen: IdGen,
}

impl PositionManager {
    pub fn new(config: PositionConfig) -> Self {
        Self {
            ledger: Ledger::with_cap(config.ledger_cap),
            balance: config.initial_balance,
            config,
            position: None,
            cooldown: 0,
            id_gen: IdGen::default(),
        }
    }

    pub fn config(&self) -> &PositionConfig {
        &self.config
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.position.is_some()
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn stats(&self) -> Stats {
        self.ledger.stats()
    }

    /// FLAT → OPEN at `price`. tp/sl are fixed percentage offsets in the
    /// direction of `side`.
    pub fn open(&mut self, side: Side, price: f64, time: i64) -> Result<&Position, TransitionError> {
        if let Some(pos) = &self.position {
            return Err(TransitionError::AlreadyOpen { side: pos.side });
        }
        if self.cooldown > 0 {
            return Err(TransitionError::CoolingDown {
                remaining: self.cooldown,
            });
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(TransitionError::InvalidPrice(price));
        }

        let (tp, sl) = match side {
            Side::Long => (
                price * (1.0 + self.config.tp_pct),
                price * (1.0 - self.config.sl_pct),
            ),
            Side::Short => (
                price * (1.0 - self.config.tp_pct),
                price * (1.0 + self.config.sl_pct),
            ),
        };

        let id = self
            .id_gen
            .next_position_id()
            .ok_or(TransitionError::IdsExhausted)?;
        let position = Position {
            id,
            side,
            entry_price: price,
            size: self.config.size,
            leverage: self.config.leverage,
            tp,
            sl,
            opened_at: time,
            pnl: 0.0,
        };
        tracing::info!(
            id = %position.id,
            side = %side,
            entry = price,
            tp,
            sl,
            "position opened"
        );
        let pos = self.position.insert(position);
        Ok(&*pos)
    }

    /// Revalue the open position at `price` and return its unrealized PnL.
    ///
    /// Returns `None` while FLAT or for a non-finite price; nothing changes then.
    pub fn mark_to_market(&mut self, price: f64) -> Option<f64> {
        if !price.is_finite() {
            return None;
        }
        let pos = self.position.as_mut()?;
        pos.pnl = pos.pnl_at(price);
        Some(pos.pnl)
    }

    /// Which level, if any, the candle's range crossed.
    ///
    /// The path inside a candle is unknown, so when both levels are crossed
    /// the stop-loss wins.
    pub fn evaluate_exit(&self, candle: &Candle) -> Option<ExitTrigger> {
        let pos = self.position.as_ref()?;
        exit_trigger(pos.side, pos.tp, pos.sl, candle)
    }

    /// OPEN → FLAT at `exit_price`. Records the trade, books the PnL and
    /// starts the cooldown.
    pub fn close(
        &mut self,
        exit_price: f64,
        reason: ExitReason,
        time: i64,
    ) -> Result<Trade, TransitionError> {
        if !exit_price.is_finite() || exit_price <= 0.0 {
            return Err(TransitionError::InvalidPrice(exit_price));
        }
        let pos = self.position.take().ok_or(TransitionError::NotOpen)?;

        let pnl = leveraged_pnl(pos.side, pos.entry_price, exit_price, pos.size, pos.leverage);
        let trade = Trade {
            id: pos.id.into(),
            side: pos.side,
            entry_price: pos.entry_price,
            exit_price,
            size: pos.size,
            leverage: pos.leverage,
            pnl,
            opened_at: pos.opened_at,
            closed_at: time,
            reason,
        };

        self.balance += pnl;
        self.cooldown = self.config.cooldown_candles;
        tracing::info!(
            id = %trade.id,
            side = %trade.side,
            exit = exit_price,
            pnl,
            reason = %reason,
            balance = self.balance,
            "position closed"
        );
        self.ledger.record(trade.clone());
        Ok(trade)
    }

    /// One closed candle has elapsed. Returns the remaining cooldown.
    pub fn tick_cooldown(&mut self) -> u32 {
        self.cooldown = self.cooldown.saturating_sub(1);
        self.cooldown
    }

    pub fn clear_cooldown(&mut self) {
        self.cooldown = 0;
    }

    /// Clear the ledger and restore the initial balance. Any open position is
    /// left as it is.
    pub fn reset(&mut self) {
        self.ledger.clear();
        self.balance = self.config.initial_balance;
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            balance: self.balance,
            trades: self.ledger.to_vec(),
        }
    }

    /// Replace balance and ledger with persisted state.
    ///
    /// A snapshot whose trade ids leave no room for new ids is malformed and
    /// ignored as a whole. Returns whether the snapshot was applied.
    pub fn restore(&mut self, snapshot: LedgerSnapshot) -> bool {
        let ledger = Ledger::from_trades(snapshot.trades, self.config.ledger_cap);
        let id_gen = match ledger.max_id() {
            Some(max) => match IdGen::starting_after(max) {
                Some(gen) => gen,
                None => {
                    tracing::warn!(max_id = max, "saved ledger has unusable trade ids, ignoring it");
                    return false;
                }
            },
            None => IdGen::default(),
        };
        self.ledger = ledger;
        self.id_gen = id_gen;
        if snapshot.balance.is_finite() {
            self.balance = snapshot.balance;
        }
        true
    }
}

/// TP/SL evaluation shared with the backtest runner.
pub fn exit_trigger(side: Side, tp: f64, sl: f64, candle: &Candle) -> Option<ExitTrigger> {
    let (sl_hit, tp_hit) = match side {
        Side::Long => (candle.low <= sl, candle.high >= tp),
        Side::Short => (candle.high >= sl, candle.low <= tp),
    };
    if sl_hit {
        Some(ExitTrigger {
            price: sl,
            reason: ExitReason::StopLoss,
        })
    } else if tp_hit {
        Some(ExitTrigger {
            price: tp,
            reason: ExitReason::TakeProfit,
        })
    } else {
        None
    }
}

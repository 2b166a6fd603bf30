//! Trade ledger and the statistics derived from it.

use crate::domain::{Trade, TradeOutcome};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of recent outcomes reported in `Stats::last_results`.
pub const RECENT_RESULTS: usize = 10;

/// Bounded ledger of closed trades, most recent first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    trades: VecDeque<Trade>,
    cap: usize,
}

impl Ledger {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            trades: VecDeque::with_capacity(cap),
            cap,
        }
    }

    /// Build from trades ordered most recent first, dropping anything past the cap.
    pub fn from_trades(trades: Vec<Trade>, cap: usize) -> Self {
        let mut trades: VecDeque<Trade> = trades.into();
        trades.truncate(cap);
        Self { trades, cap }
    }

    /// Prepend a trade, evicting the oldest beyond the cap.
    pub fn record(&mut self, trade: Trade) {
        self.trades.push_front(trade);
        self.trades.truncate(self.cap);
    }

    pub fn clear(&mut self) {
        self.trades.clear();
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Most recent trade, if any.
    pub fn latest(&self) -> Option<&Trade> {
        self.trades.front()
    }

    /// Trades, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter()
    }

    pub fn to_vec(&self) -> Vec<Trade> {
        self.trades.iter().cloned().collect()
    }

    /// Highest trade id present, for seeding id generation after a restore.
    pub fn max_id(&self) -> Option<u64> {
        self.trades.iter().map(|t| t.id.0).max()
    }

    pub fn stats(&self) -> Stats {
        Stats::from_trades(self.trades.iter())
    }
}

/// Projection of the ledger. Recomputed on demand, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Winning trades as a percentage of all trades.
    pub win_rate: f64,
    pub total_pnl: f64,
    pub trade_count: usize,
    /// Up to the last ten outcomes, most recent first.
    pub last_results: Vec<TradeOutcome>,
}

impl Stats {
    /// `trades` must be ordered most recent first.
    pub fn from_trades<'a>(trades: impl Iterator<Item = &'a Trade>) -> Self {
        let mut wins = 0usize;
        let mut count = 0usize;
        let mut total_pnl = 0.0;
        let mut last_results = Vec::with_capacity(RECENT_RESULTS);

        for trade in trades {
            if trade.is_winner() {
                wins += 1;
            }
            total_pnl += trade.pnl;
            if last_results.len() < RECENT_RESULTS {
                last_results.push(trade.outcome());
            }
            count += 1;
        }

        if count == 0 {
            return Self::default();
        }

        Self {
            win_rate: wins as f64 / count as f64 * 100.0,
            total_pnl,
            trade_count: count,
            last_results,
        }
    }
}

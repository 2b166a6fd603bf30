//! Session: the single writer that turns feed events into signals and
//! position transitions for one watched market.
//!
//! Every event carries the epoch of the subscription that produced it.
//! Switching market bumps the epoch, so callbacks from a superseded feed are
//! dropped instead of mutating state.
//!
//! Signals are evaluated and the cooldown decays once per newly closed
//! candle. Provisional updates only revalue the open position and check its
//! exit levels.

pub mod log;
pub mod store;

pub use log::{EventLog, LogEntry};
pub use store::{
    load_snapshot, save_snapshot, KeyValueStore, MemoryStore, StoreError, BALANCE_KEY, TRADES_KEY,
};

use crate::domain::{Candle, CandleUpdate, ExitReason, Position, Side, Signal, Trade};
use crate::error::{require_period, ConfigError};
use crate::feed::Timeframe;
use crate::position::{Ledger, PositionConfig, PositionManager, Stats, TransitionError};
use crate::strategy::{detect_signal, StrategyConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Closed candles kept for signal evaluation.
    pub history_window: usize,
    pub log_cap: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            timeframe: Timeframe::default(),
            history_window: 500,
            log_cap: 100,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Empty { name: "symbol" });
        }
        require_period("history_window", self.history_window)?;
        require_period("log_cap", self.log_cap)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a {side} position is open; close it first")]
    Locked { side: Side },

    #[error("no market price received yet")]
    NoPrice,

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

pub struct Session {
    symbol: String,
    timeframe: Timeframe,
    window: usize,
    epoch: u64,
    history: Vec<Candle>,
    forming: Option<Candle>,
    last_processed: Option<i64>,
    signal: Option<Signal>,
    strategy: StrategyConfig,
    manager: PositionManager,
    log: EventLog,
    store: Option<Box<dyn KeyValueStore>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("symbol", &self.symbol)
            .field("timeframe", &self.timeframe)
            .field("epoch", &self.epoch)
            .field("history_len", &self.history.len())
            .field("last_processed", &self.last_processed)
            .field("position", &self.manager.position())
            .field("cooldown", &self.manager.cooldown())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Build a session after validating every config section.
    pub fn new(
        strategy: StrategyConfig,
        position: PositionConfig,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        strategy.validate()?;
        position.validate()?;
        config.validate()?;
        Ok(Self {
            symbol: config.symbol,
            timeframe: config.timeframe,
            window: config.history_window,
            epoch: 1,
            history: Vec::new(),
            forming: None,
            last_processed: None,
            signal: None,
            strategy,
            manager: PositionManager::new(position),
            log: EventLog::with_cap(config.log_cap),
            store: None,
        })
    }

    /// Attach a persistence store and restore any ledger saved in it.
    pub fn with_store(mut self, store: Box<dyn KeyValueStore>) -> Self {
        match load_snapshot(store.as_ref()) {
            Ok(Some(snapshot)) => {
                let trades = snapshot.trades.len();
                if self.manager.restore(snapshot) {
                    tracing::info!(trades, "restored ledger");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "could not load saved ledger, starting fresh"),
        }
        self.store = Some(store);
        self
    }

    // --- accessors ---

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> &Timeframe {
        &self.timeframe
    }

    /// Closed candles, oldest first.
    pub fn history(&self) -> &[Candle] {
        &self.history
    }

    pub fn forming(&self) -> Option<&Candle> {
        self.forming.as_ref()
    }

    /// Close of the forming candle, else of the last closed one.
    pub fn last_price(&self) -> Option<f64> {
        self.forming.or(self.history.last().copied()).map(|c| c.close)
    }

    pub fn signal(&self) -> Option<&Signal> {
        self.signal.as_ref()
    }

    pub fn position(&self) -> Option<&Position> {
        self.manager.position()
    }

    pub fn balance(&self) -> f64 {
        self.manager.balance()
    }

    pub fn cooldown(&self) -> u32 {
        self.manager.cooldown()
    }

    pub fn ledger(&self) -> &Ledger {
        self.manager.ledger()
    }

    pub fn stats(&self) -> Stats {
        self.manager.stats()
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn strategy(&self) -> &StrategyConfig {
        &self.strategy
    }

    // --- market selection ---

    /// Watch a different market. Refused while a position is open.
    ///
    /// Returns the new epoch; the caller subscribes its feed under it.
    pub fn switch_market(&mut self, symbol: &str, timeframe: Timeframe) -> Result<u64, SessionError> {
        if let Some(pos) = self.manager.position() {
            tracing::debug!(side = %pos.side, "market switch refused");
            return Err(SessionError::Locked { side: pos.side });
        }

        if symbol != self.symbol {
            self.log.push(format!("Asset switched to {symbol}"));
        }
        if timeframe != self.timeframe {
            self.log.push(format!("Timeframe set to {timeframe}"));
        }

        self.symbol = symbol.to_string();
        self.timeframe = timeframe;
        self.epoch += 1;
        self.history.clear();
        self.forming = None;
        self.last_processed = None;
        self.signal = None;
        self.manager.clear_cooldown();

        tracing::info!(epoch = self.epoch, symbol, timeframe = %self.timeframe, "market switched");
        Ok(self.epoch)
    }

    // --- feed events ---

    /// Replace closed history with a backfill batch.
    ///
    /// Candles that fail the sanity check or do not advance time are dropped;
    /// only the newest `history_window` are kept. Returns false for a stale
    /// epoch.
    ///
    /// The new-candle step runs once, for the newest candle, however many
    /// closed candles the batch adds. Gap candles tick the cooldown once in
    /// total and are not checked against an open position's exit levels.
    pub fn replace_history(&mut self, epoch: u64, candles: Vec<Candle>) -> bool {
        if self.is_stale(epoch) {
            return false;
        }

        let total = candles.len();
        let mut kept: Vec<Candle> = Vec::with_capacity(total);
        for c in candles {
            if c.is_sane() && kept.last().map_or(true, |last| c.time > last.time) {
                kept.push(c);
            }
        }
        if kept.len() < total {
            tracing::debug!(dropped = total - kept.len(), "dropped unusable backfill candles");
        }
        if kept.len() > self.window {
            kept.drain(..kept.len() - self.window);
        }
        self.history = kept;

        if let (Some(forming), Some(last)) = (self.forming, self.history.last()) {
            if forming.time <= last.time {
                self.forming = None;
            }
        }
        if let Some(last) = self.history.last().copied() {
            self.on_new_candle(last);
        }
        true
    }

    /// Apply one live update. Returns false when the update was ignored.
    pub fn on_update(&mut self, epoch: u64, update: CandleUpdate) -> bool {
        if self.is_stale(epoch) {
            return false;
        }
        let candle = *update.candle();
        if !candle.is_sane() {
            tracing::debug!(time = candle.time, "ignoring malformed candle");
            return false;
        }

        let last_closed = self.history.last().map(|c| c.time);
        match last_closed {
            Some(t) if candle.time < t => {
                tracing::debug!(time = candle.time, last_closed = t, "ignoring update older than closed history");
                return false;
            }
            Some(t) if candle.time == t && !update.is_final() => {
                tracing::debug!(time = t, "ignoring provisional update for a closed candle");
                return false;
            }
            _ => {}
        }
        if let (CandleUpdate::Provisional(_), Some(forming)) = (update, self.forming) {
            if candle.time < forming.time {
                tracing::debug!(time = candle.time, forming = forming.time, "ignoring out-of-order tick");
                return false;
            }
        }

        let redelivered = update.is_final() && last_closed == Some(candle.time);
        if !redelivered {
            self.check_exit(&candle);
        }

        match update {
            CandleUpdate::Provisional(_) => {
                self.forming = Some(candle);
            }
            CandleUpdate::Final(_) if last_closed == Some(candle.time) => {
                // Redelivered close: keep the latest values, never re-run the step.
                if let Some(last) = self.history.last_mut() {
                    *last = candle;
                }
                tracing::debug!(time = candle.time, "revised closed candle");
            }
            CandleUpdate::Final(_) => {
                self.history.push(candle);
                if self.history.len() > self.window {
                    let excess = self.history.len() - self.window;
                    self.history.drain(..excess);
                }
                if self.forming.is_some_and(|f| f.time <= candle.time) {
                    self.forming = None;
                }
                self.on_new_candle(candle);
            }
        }
        true
    }

    // --- manual actions ---

    /// Open at the latest price, ignoring the strategy.
    pub fn open_manual(&mut self, side: Side) -> Result<Position, SessionError> {
        let (price, time) = self.latest_quote().ok_or(SessionError::NoPrice)?;
        let position = self.manager.open(side, price, time)?.clone();
        self.log
            .push(format!("MANUAL: {side} Opening Position @ {price:.2}"));
        Ok(position)
    }

    /// Close the open position at the latest price.
    pub fn close_manual(&mut self) -> Result<Trade, SessionError> {
        if !self.manager.is_open() {
            return Err(TransitionError::NotOpen.into());
        }
        let (price, time) = self.latest_quote().ok_or(SessionError::NoPrice)?;
        self.close_position(price, ExitReason::Manual, time)
    }

    /// Wipe the ledger and restore the starting balance. Only while FLAT.
    pub fn reset_ledger(&mut self) -> Result<(), SessionError> {
        if let Some(pos) = self.manager.position() {
            return Err(SessionError::Locked { side: pos.side });
        }
        self.manager.reset();
        self.log.push("Ledger reset");
        tracing::info!(balance = self.manager.balance(), "ledger reset");
        self.persist();
        Ok(())
    }

    // --- internals ---

    fn is_stale(&self, epoch: u64) -> bool {
        if epoch != self.epoch {
            tracing::debug!(epoch, current = self.epoch, "ignoring event from superseded feed");
            return true;
        }
        false
    }

    fn latest_quote(&self) -> Option<(f64, i64)> {
        self.forming
            .or(self.history.last().copied())
            .map(|c| (c.close, c.time))
    }

    /// Mark the open position to `candle` and close it if a level was crossed.
    ///
    /// A candle that started at or before the entry traded partly before the
    /// fill, so its range never triggers an exit.
    fn check_exit(&mut self, candle: &Candle) {
        if self.manager.mark_to_market(candle.close).is_none() {
            return;
        }
        if self
            .manager
            .position()
            .is_some_and(|p| candle.time <= p.opened_at)
        {
            return;
        }
        if let Some(trigger) = self.manager.evaluate_exit(candle) {
            if let Err(e) = self.close_position(trigger.price, trigger.reason, candle.time) {
                tracing::debug!(error = %e, "exit not applied");
            }
        }
    }

    fn close_position(
        &mut self,
        price: f64,
        reason: ExitReason,
        time: i64,
    ) -> Result<Trade, SessionError> {
        let trade = self.manager.close(price, reason, time)?;
        self.log
            .push(format!("Position CLOSED by {reason} at {price:.2}"));
        self.persist();
        Ok(trade)
    }

    /// Runs once per newly closed candle; `candle` is the newest entry of `history`.
    fn on_new_candle(&mut self, candle: Candle) {
        if self.last_processed.is_some_and(|t| candle.time <= t) {
            return;
        }
        self.last_processed = Some(candle.time);

        let signal = detect_signal(&self.history, &self.strategy);

        if self.manager.cooldown() > 0 {
            let remaining = self.manager.tick_cooldown();
            tracing::debug!(remaining, signal = %signal.kind, "cooling down, entry suppressed");
        } else if !self.manager.is_open() {
            if let Some(side) = signal.kind.side() {
                match self.manager.open(side, signal.price, signal.time) {
                    Ok(_) => {
                        tracing::info!(side = %side, reason = %signal.reason, "entry signal");
                        self.log.push(format!(
                            "SIGNAL: {} detected. Opening Position @ {:.2}",
                            signal.kind, signal.price
                        ));
                    }
                    Err(e) => tracing::debug!(error = %e, "entry rejected"),
                }
            }
        }

        self.signal = Some(signal);
    }

    fn persist(&mut self) {
        let snapshot = self.manager.snapshot();
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = save_snapshot(store.as_mut(), &snapshot) {
                tracing::warn!(error = %e, "failed to persist ledger");
            }
        }
    }
}

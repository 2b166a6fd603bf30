use crate::error::{require_fraction, require_period, require_positive, ConfigError};
use serde::{Deserialize, Serialize};

/// Sizing, exit levels and bookkeeping limits for simulated positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    pub leverage: f64,
    /// Margin committed per position, in quote currency.
    pub size: f64,
    /// Take-profit distance as a fraction of entry (0.0025 = 0.25%).
    pub tp_pct: f64,
    /// Stop-loss distance as a fraction of entry.
    pub sl_pct: f64,
    /// Closed candles to sit out after every close.
    pub cooldown_candles: u32,
    pub ledger_cap: usize,
    pub initial_balance: f64,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            leverage: 20.0,
            size: 1000.0,
            tp_pct: 0.0025,
            sl_pct: 0.0015,
            cooldown_candles: 2,
            ledger_cap: 50,
            initial_balance: 50_000.0,
        }
    }
}

impl PositionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("leverage", self.leverage)?;
        require_positive("size", self.size)?;
        require_positive("initial_balance", self.initial_balance)?;
        require_fraction("tp_pct", self.tp_pct)?;
        require_fraction("sl_pct", self.sl_pct)?;
        require_period("ledger_cap", self.ledger_cap)?;
        Ok(())
    }
}

//! Strategy configuration.
//!
//! Exactly one rule set is active per deployment; the two rule sets are
//! materially different and are never blended.

use crate::error::{require_period, ConfigError};
use serde::{Deserialize, Serialize};

/// Trend filter plus pullback entry.
///
/// LONG: EMA(trend_fast) > EMA(trend_slow), previous-bar RSI < `rsi_oversold`,
/// close back above EMA(momentum_period). SHORT mirrors with `rsi_overbought`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendPullbackParams {
    pub trend_fast: usize,
    pub trend_slow: usize,
    pub momentum_period: usize,
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
}

impl Default for TrendPullbackParams {
    fn default() -> Self {
        Self {
            trend_fast: 50,
            trend_slow: 200,
            momentum_period: 9,
            rsi_period: 14,
            rsi_oversold: 45.0,
            rsi_overbought: 55.0,
        }
    }
}

impl TrendPullbackParams {
    /// Candles needed before every input of the rule is defined.
    ///
    /// The RSI term reads the previous bar, so it needs one candle more than
    /// its own lookback.
    pub fn warmup(&self) -> usize {
        self.trend_fast
            .max(self.trend_slow)
            .max(self.momentum_period)
            .max(self.rsi_period + 2)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_period("trend_fast", self.trend_fast)?;
        require_period("trend_slow", self.trend_slow)?;
        require_period("momentum_period", self.momentum_period)?;
        require_period("rsi_period", self.rsi_period)?;
        if self.trend_fast >= self.trend_slow {
            return Err(ConfigError::TrendPeriodsInverted {
                fast: self.trend_fast,
                slow: self.trend_slow,
            });
        }
        check_threshold("rsi_oversold", self.rsi_oversold)?;
        check_threshold("rsi_overbought", self.rsi_overbought)?;
        if self.rsi_oversold > self.rsi_overbought {
            return Err(ConfigError::ThresholdsInverted {
                oversold: self.rsi_oversold,
                overbought: self.rsi_overbought,
            });
        }
        Ok(())
    }
}

/// Fast/slow EMA trend with a fast/slow RSI momentum comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DualRsiParams {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi_fast: usize,
    pub rsi_slow: usize,
}

impl Default for DualRsiParams {
    fn default() -> Self {
        Self {
            ema_fast: 21,
            ema_slow: 65,
            rsi_fast: 25,
            rsi_slow: 100,
        }
    }
}

impl DualRsiParams {
    pub fn warmup(&self) -> usize {
        self.ema_fast
            .max(self.ema_slow)
            .max(self.rsi_fast + 1)
            .max(self.rsi_slow + 1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_period("ema_fast", self.ema_fast)?;
        require_period("ema_slow", self.ema_slow)?;
        require_period("rsi_fast", self.rsi_fast)?;
        require_period("rsi_slow", self.rsi_slow)?;
        if self.ema_fast >= self.ema_slow {
            return Err(ConfigError::TrendPeriodsInverted {
                fast: self.ema_fast,
                slow: self.ema_slow,
            });
        }
        Ok(())
    }
}

/// The active rule set (serializable enum).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyRule {
    TrendPullback(TrendPullbackParams),
    DualRsi(DualRsiParams),
}

impl Default for StrategyRule {
    fn default() -> Self {
        StrategyRule::TrendPullback(TrendPullbackParams::default())
    }
}

/// Strategy configuration: minimum history plus one rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Histories shorter than this always produce a NEUTRAL "insufficient data" signal.
    pub min_history: usize,
    pub rule: StrategyRule,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            min_history: 100,
            rule: StrategyRule::default(),
        }
    }
}

impl StrategyConfig {
    pub fn trend_pullback(params: TrendPullbackParams) -> Self {
        Self {
            rule: StrategyRule::TrendPullback(params),
            ..Self::default()
        }
    }

    pub fn dual_rsi(params: DualRsiParams) -> Self {
        Self {
            rule: StrategyRule::DualRsi(params),
            ..Self::default()
        }
    }

    /// Candles needed before a non-NEUTRAL signal is possible.
    pub fn warmup(&self) -> usize {
        let rule_warmup = match &self.rule {
            StrategyRule::TrendPullback(p) => p.warmup(),
            StrategyRule::DualRsi(p) => p.warmup(),
        };
        rule_warmup.max(self.min_history)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_period("min_history", self.min_history)?;
        match &self.rule {
            StrategyRule::TrendPullback(p) => p.validate(),
            StrategyRule::DualRsi(p) => p.validate(),
        }
    }
}

fn check_threshold(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(ConfigError::ThresholdOutOfRange { name, value });
    }
    Ok(())
}

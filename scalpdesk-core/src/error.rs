//! Configuration validation errors shared by the strategy, position and backtest configs.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be >= 1 (got {value})")]
    ZeroPeriod { name: &'static str, value: usize },

    #[error("trend periods must satisfy fast < slow (got fast={fast}, slow={slow})")]
    TrendPeriodsInverted { fast: usize, slow: usize },

    #[error("{name} must lie in [0, 100] (got {value})")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("rsi_oversold ({oversold}) must not exceed rsi_overbought ({overbought})")]
    ThresholdsInverted { oversold: f64, overbought: f64 },

    #[error("{name} must be a finite positive number (got {value})")]
    NotPositive { name: &'static str, value: f64 },

    #[error("{name} must be a fraction in (0, 1) (got {value})")]
    FractionOutOfRange { name: &'static str, value: f64 },

    #[error("{name} must not be empty")]
    Empty { name: &'static str },
}

pub(crate) fn require_period(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ZeroPeriod { name, value });
    }
    Ok(())
}

pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::NotPositive { name, value });
    }
    Ok(())
}

pub(crate) fn require_fraction(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(value > 0.0 && value < 1.0) {
        return Err(ConfigError::FractionOutOfRange { name, value });
    }
    Ok(())
}

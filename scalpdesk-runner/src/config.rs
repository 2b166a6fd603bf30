//! Application configuration loaded from TOML.
//!
//! Every section is optional and falls back to the built-in defaults:
//!
//! ```toml
//! [strategy]
//! min_history = 100
//! [strategy.rule]
//! type = "trend_pullback"
//! rsi_oversold = 40.0
//!
//! [position]
//! leverage = 10.0
//!
//! [backtest]
//! max_trades = 100
//!
//! [session]
//! symbol = "ETHUSDT"
//! timeframe = "5m"
//! ```

use scalpdesk_core::backtest::BacktestConfig;
use scalpdesk_core::position::PositionConfig;
use scalpdesk_core::session::SessionConfig;
use scalpdesk_core::strategy::StrategyConfig;
use scalpdesk_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("[{section}] {source}")]
    Invalid {
        section: &'static str,
        #[source]
        source: ConfigError,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub strategy: StrategyConfig,
    pub position: PositionConfig,
    pub backtest: BacktestConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    /// Parse and validate.
    pub fn from_toml_str(s: &str) -> Result<Self, AppConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, AppConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| AppConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, AppConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), AppConfigError> {
        let section = |section: &'static str| move |source| AppConfigError::Invalid { section, source };
        self.strategy.validate().map_err(section("strategy"))?;
        self.position.validate().map_err(section("position"))?;
        self.backtest.validate().map_err(section("backtest"))?;
        self.session.validate().map_err(section("session"))?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

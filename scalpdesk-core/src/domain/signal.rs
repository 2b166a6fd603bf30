//! Signal: the strategy's verdict for the newest closed candle.

use super::position::Side;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    Long,
    Short,
    Neutral,
}

impl SignalKind {
    /// Entry side implied by the signal, if any.
    pub fn side(self) -> Option<Side> {
        match self {
            SignalKind::Long => Some(Side::Long),
            SignalKind::Short => Some(Side::Short),
            SignalKind::Neutral => None,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Long => f.write_str("LONG"),
            SignalKind::Short => f.write_str("SHORT"),
            SignalKind::Neutral => f.write_str("NEUTRAL"),
        }
    }
}

/// Output of signal detection.
///
/// `reason` is for humans reading logs; nothing parses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(rename = "type")]
    pub kind: SignalKind,
    pub price: f64,
    pub time: i64,
    pub reason: String,
}

impl Signal {
    pub fn neutral(price: f64, time: i64, reason: impl Into<String>) -> Self {
        Self {
            kind: SignalKind::Neutral,
            price,
            time,
            reason: reason.into(),
        }
    }

    pub fn is_entry(&self) -> bool {
        self.kind != SignalKind::Neutral
    }
}

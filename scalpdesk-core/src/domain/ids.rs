use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a simulated position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Identifier of a closed trade. A trade keeps the id of the position it closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradeId(pub u64);

impl From<PositionId> for TradeId {
    fn from(id: PositionId) -> Self {
        Self(id.0)
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Monotonic id source.
///
/// Seeded past the highest id already present in a restored ledger so that
/// ids never repeat across restarts.
#[derive(Debug, Clone, Default)]
pub struct IdGen {
    next: u64,
}

impl IdGen {
    /// `None` when `last` is the largest representable id.
    pub fn starting_after(last: u64) -> Option<Self> {
        last.checked_add(1).map(|next| Self { next })
    }

    /// `None` once the id space is used up; the generator is left unchanged.
    pub fn next_position_id(&mut self) -> Option<PositionId> {
        let id = PositionId(self.next);
        self.next = self.next.checked_add(1)?;
        Some(id)
    }
}

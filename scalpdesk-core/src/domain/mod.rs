//! Domain types for ScalpDesk

pub mod candle;
pub mod ids;
pub mod position;
pub mod signal;
pub mod trade;

pub use candle::{Candle, CandleUpdate};
pub use ids::{IdGen, PositionId, TradeId};
pub use position::{leveraged_pnl, Position, Side};
pub use signal::{Signal, SignalKind};
pub use trade::{ExitReason, Trade, TradeOutcome};

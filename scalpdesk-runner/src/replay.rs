//! Replay a recorded candle series through a live session.
//!
//! The first `backfill` candles arrive as one history snapshot, the way a
//! REST backfill would. Every later candle is split into provisional ticks
//! that walk from its open to its close, then run through the
//! `FeedNormalizer` so the session sees the same `Provisional`/`Final`
//! sequence a kline stream produces.

use anyhow::{Context, Result};
use scalpdesk_core::domain::Candle;
use scalpdesk_core::driver::SessionDriver;
use scalpdesk_core::feed::FeedNormalizer;
use scalpdesk_core::session::Session;

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOptions {
    /// Candles delivered as the initial history snapshot.
    pub backfill: usize,
    /// Provisional ticks per streamed candle; the last one is the full candle.
    pub ticks_per_candle: usize,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            backfill: 250,
            ticks_per_candle: 4,
        }
    }
}

/// Split a closed candle into `n` ticks sharing its open time.
///
/// Intermediate ticks move the close linearly toward the final close; the
/// last tick is the candle itself.
pub fn split_into_ticks(candle: &Candle, n: usize) -> Vec<Candle> {
    let n = n.max(1);
    let mut ticks = Vec::with_capacity(n);
    for i in 1..n {
        let close = candle.open + (candle.close - candle.open) * i as f64 / n as f64;
        ticks.push(Candle::new(
            candle.time,
            candle.open,
            candle.open.max(close),
            candle.open.min(close),
            close,
        ));
    }
    ticks.push(*candle);
    ticks
}

/// Drive `session` through `candles` on the session thread and return it.
pub fn replay(session: Session, candles: &[Candle], opts: &ReplayOptions) -> Result<Session> {
    let backfill = opts.backfill.min(candles.len());
    let (history, stream) = candles.split_at(backfill);
    let epoch = session.epoch();

    let driver = SessionDriver::spawn(session).context("failed to start session thread")?;
    let handle = driver.handle();

    handle
        .replace_history(epoch, history.to_vec())
        .context("session thread stopped during backfill")?;

    let mut normalizer = FeedNormalizer::new();
    let mut sent = 0usize;
    for candle in stream {
        for tick in split_into_ticks(candle, opts.ticks_per_candle) {
            for update in normalizer.push(tick) {
                handle
                    .update(epoch, update)
                    .context("session thread stopped during replay")?;
                sent += 1;
            }
        }
    }
    if let Some(update) = normalizer.flush() {
        handle
            .update(epoch, update)
            .context("session thread stopped during replay")?;
        sent += 1;
    }

    let session = driver.shutdown().context("session thread failed")?;
    tracing::info!(
        backfill,
        streamed = stream.len(),
        updates = sent,
        trades = session.ledger().len(),
        "replay finished"
    );
    Ok(session)
}

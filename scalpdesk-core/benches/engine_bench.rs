//! Criterion benchmarks for ScalpDesk hot paths.
//!
//! Benchmarks:
//! 1. Indicator series (EMA, RSI) over a full history window
//! 2. Signal detection per closed candle
//! 3. Session update handling (provisional ticks and closed candles)
//! 4. Offline backtest over a long batch

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use scalpdesk_core::backtest::{run_backtest, BacktestConfig};
use scalpdesk_core::domain::{Candle, CandleUpdate};
use scalpdesk_core::indicators::{Ema, Indicator, Rsi};
use scalpdesk_core::position::PositionConfig;
use scalpdesk_core::session::{Session, SessionConfig};
use scalpdesk_core::strategy::{detect_signal, DualRsiParams, StrategyConfig, TrendPullbackParams};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_candles(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 2.0 + i as f64 * 0.01;
            let open = close - 0.05;
            Candle::new(60 * i as i64, open, close + 0.1, open - 0.1, close)
        })
        .collect()
}

// ── 1. Indicators ────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");
    let candles = make_candles(500);

    for period in [9usize, 50, 200] {
        let ema = Ema::new(period);
        group.bench_with_input(BenchmarkId::new("ema_500", period), &candles, |b, data| {
            b.iter(|| ema.compute(black_box(data)))
        });
    }
    let rsi = Rsi::new(14);
    group.bench_function("rsi14_500", |b| b.iter(|| rsi.compute(black_box(&candles))));

    group.finish();
}

// ── 2. Signal detection ──────────────────────────────────────────────

fn bench_signal(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal");
    let candles = make_candles(500);

    let trend = StrategyConfig::trend_pullback(TrendPullbackParams::default());
    group.bench_function("trend_pullback_500", |b| {
        b.iter(|| detect_signal(black_box(&candles), &trend))
    });
    let dual = StrategyConfig::dual_rsi(DualRsiParams::default());
    group.bench_function("dual_rsi_500", |b| {
        b.iter(|| detect_signal(black_box(&candles), &dual))
    });

    group.finish();
}

// ── 3. Session updates ───────────────────────────────────────────────

fn bench_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");
    let candles = make_candles(600);
    let (backfill, live) = candles.split_at(500);

    group.bench_function("100_closed_candles", |b| {
        b.iter(|| {
            let mut session = Session::new(
                StrategyConfig::default(),
                PositionConfig::default(),
                SessionConfig::default(),
            )
            .unwrap();
            let epoch = session.epoch();
            session.replace_history(epoch, backfill.to_vec());
            for candle in live {
                session.on_update(epoch, CandleUpdate::Provisional(*candle));
                session.on_update(epoch, CandleUpdate::Final(*candle));
            }
            session
        })
    });

    group.finish();
}

// ── 4. Backtest ──────────────────────────────────────────────────────

fn bench_backtest(c: &mut Criterion) {
    let mut group = c.benchmark_group("backtest");
    let config = BacktestConfig::default();

    for n in [1_000usize, 10_000] {
        let candles = make_candles(n);
        group.bench_with_input(BenchmarkId::new("run", n), &candles, |b, data| {
            b.iter(|| run_backtest(black_box(data), &config))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_indicators,
    bench_signal,
    bench_session,
    bench_backtest,
);
criterion_main!(benches);

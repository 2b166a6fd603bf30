//! Candle loading for offline runs.
//!
//! Two sources:
//! 1. CSV files with a `time,open,high,low,close[,volume]` header, `time` in
//!    Unix seconds. Rows must be sane and strictly increasing in time.
//! 2. A seeded random walk, the offline stand-in for a live exchange feed.
//!    Same seed, same candles.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scalpdesk_core::domain::Candle;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {source}")]
    Csv {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("line {line}: malformed CSV: {source}")]
    Malformed {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("line {line}: candle at {time} fails OHLC sanity checks")]
    InsaneCandle { line: u64, time: i64 },

    #[error("line {line}: time {time} does not advance past {prev}")]
    NotIncreasing { line: u64, time: i64, prev: i64 },

    #[error("no candles in input")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    time: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

impl From<CsvRow> for Candle {
    fn from(r: CsvRow) -> Self {
        Candle {
            time: r.time,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
        }
    }
}

pub fn load_candles_csv(path: &Path) -> Result<Vec<Candle>, DataError> {
    let file = std::fs::File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let candles = parse_candles_csv(file)?;
    tracing::info!(path = %path.display(), candles = candles.len(), "loaded candles");
    Ok(candles)
}

/// Parse candles from any CSV reader. Fails on the first bad row.
pub fn parse_candles_csv<R: Read>(reader: R) -> Result<Vec<Candle>, DataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut candles: Vec<Candle> = Vec::new();
    for result in rdr.deserialize::<CsvRow>() {
        let row = result.map_err(|source| {
            let line = source.position().map(|p| p.line()).unwrap_or(0);
            match source.kind() {
                csv::ErrorKind::Deserialize { .. } => DataError::Csv { line, source },
                _ => DataError::Malformed { line, source },
            }
        })?;
        // Header is line 1; data rows follow in order.
        let line = candles.len() as u64 + 2;
        let candle = Candle::from(row);
        if !candle.is_sane() {
            return Err(DataError::InsaneCandle {
                line,
                time: candle.time,
            });
        }
        if let Some(prev) = candles.last() {
            if candle.time <= prev.time {
                return Err(DataError::NotIncreasing {
                    line,
                    time: candle.time,
                    prev: prev.time,
                });
            }
        }
        candles.push(candle);
    }

    if candles.is_empty() {
        return Err(DataError::Empty);
    }
    Ok(candles)
}

/// Parameters of the synthetic random walk.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticOptions {
    pub seed: u64,
    pub start_price: f64,
    pub start_time: i64,
    pub interval_secs: i64,
    /// Peak-to-peak close-to-close move as a fraction of price.
    pub volatility: f64,
    /// Largest wick beyond the body, as a fraction of price.
    pub max_wick: f64,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            start_price: 95_000.0,
            start_time: 1_700_000_000,
            interval_secs: 60,
            volatility: 0.001,
            max_wick: 0.0005,
        }
    }
}

/// Generate `n` closed candles; each opens at the previous close.
pub fn generate_synthetic(n: usize, opts: &SyntheticOptions) -> Vec<Candle> {
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut candles = Vec::with_capacity(n);
    let mut price = opts.start_price;
    let mut time = opts.start_time;

    for _ in 0..n {
        let open = price;
        let close = open + open * (rng.gen::<f64>() - 0.5) * opts.volatility;
        let high = open.max(close) + open * rng.gen::<f64>() * opts.max_wick;
        let low = open.min(close) - open * rng.gen::<f64>() * opts.max_wick;
        let volume = rng.gen::<f64>() * 10.0;
        candles.push(Candle::new(time, open, high, low, close).with_volume(volume));

        price = close;
        time += opts.interval_secs;
    }

    candles
}

/// Deterministic BLAKE3 hash over candle times and prices.
pub fn dataset_hash(candles: &[Candle]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in candles {
        hasher.update(&c.time.to_le_bytes());
        hasher.update(&c.open.to_le_bytes());
        hasher.update(&c.high.to_le_bytes());
        hasher.update(&c.low.to_le_bytes());
        hasher.update(&c.close.to_le_bytes());
        if let Some(v) = c.volume {
            hasher.update(&v.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

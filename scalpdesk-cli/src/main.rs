//! ScalpDesk CLI: backtests, replays and the persisted paper ledger.
//!
//! Commands:
//! - `backtest`: run the offline backtest on CSV or synthetic candles
//! - `replay`: stream a CSV through a live session, booking trades to the ledger
//! - `simulate`: same as `replay`, fed by the seeded synthetic walk
//! - `sweep`: grid search over RSI thresholds and TP/SL
//! - `stats`: print the persisted ledger and its statistics
//! - `reset`: wipe the persisted ledger

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use scalpdesk_core::domain::Candle;
use scalpdesk_core::session::Session;
use scalpdesk_runner::{
    export_stats_json, export_trades_csv, generate_synthetic, load_candles_csv, replay,
    run_sweep, save_artifacts, AppConfig, BacktestReport, JsonFileStore, ParamGrid,
    ReplayOptions, SyntheticOptions,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scalpdesk", about = "ScalpDesk, simulated crypto scalping desk")]
struct Cli {
    /// Path to a TOML config file. Built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// CSV file with `time,open,high,low,close[,volume]` rows.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Synthetic candles to generate when no CSV is given.
    #[arg(long, default_value_t = 1000)]
    candles: usize,

    /// Seed for the synthetic walk.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Args)]
struct StoreArgs {
    /// Ledger file. Defaults to the platform data directory.
    #[arg(long)]
    store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the offline backtest.
    Backtest {
        #[command(flatten)]
        data: DataArgs,

        /// Write report.json and trades.csv under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the full report as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Stream a CSV file through a live session.
    Replay {
        /// CSV file to replay.
        data: PathBuf,

        #[command(flatten)]
        replay: ReplayArgs,

        #[command(flatten)]
        store: StoreArgs,
    },
    /// Run a live session against the seeded synthetic feed.
    Simulate {
        /// Candles to stream, backfill included.
        #[arg(long, default_value_t = 1000)]
        candles: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[command(flatten)]
        replay: ReplayArgs,

        #[command(flatten)]
        store: StoreArgs,
    },
    /// Grid search over RSI thresholds and TP/SL.
    Sweep {
        #[command(flatten)]
        data: DataArgs,

        /// Rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Print the persisted ledger statistics.
    Stats {
        #[command(flatten)]
        store: StoreArgs,

        /// Also write the ledger trades to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Wipe the persisted ledger and restore the starting balance.
    Reset {
        #[command(flatten)]
        store: StoreArgs,
    },
}

#[derive(Args)]
struct ReplayArgs {
    /// Candles delivered as the initial history snapshot.
    #[arg(long, default_value_t = 250)]
    backfill: usize,

    /// Provisional ticks per streamed candle.
    #[arg(long, default_value_t = 4)]
    ticks: usize,

    /// Do not read or write the ledger file.
    #[arg(long, default_value_t = false)]
    no_persist: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;

    match cli.command {
        Commands::Backtest {
            data,
            output_dir,
            json,
        } => run_backtest_cmd(&config, &data, output_dir.as_deref(), json),
        Commands::Replay {
            data,
            replay,
            store,
        } => {
            let candles = load_candles_csv(&data)
                .with_context(|| format!("failed to load {}", data.display()))?;
            run_session_cmd(&config, &candles, &replay, &store)
        }
        Commands::Simulate {
            candles,
            seed,
            replay,
            store,
        } => {
            let candles = generate_synthetic(
                candles,
                &SyntheticOptions {
                    seed,
                    interval_secs: config.session.timeframe.seconds(),
                    ..Default::default()
                },
            );
            run_session_cmd(&config, &candles, &replay, &store)
        }
        Commands::Sweep { data, top } => run_sweep_cmd(&config, &data, top),
        Commands::Stats { store, csv } => run_stats_cmd(&config, &store, csv.as_deref()),
        Commands::Reset { store } => run_reset_cmd(&config, &store),
    }
}

fn load_data(config: &AppConfig, args: &DataArgs) -> Result<Vec<Candle>> {
    match &args.data {
        Some(path) => load_candles_csv(path).with_context(|| format!("failed to load {}", path.display())),
        None => {
            if args.candles == 0 {
                bail!("--candles must be greater than zero");
            }
            Ok(generate_synthetic(
                args.candles,
                &SyntheticOptions {
                    seed: args.seed,
                    interval_secs: config.session.timeframe.seconds(),
                    ..Default::default()
                },
            ))
        }
    }
}

fn store_path(args: &StoreArgs) -> PathBuf {
    args.store.clone().unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scalpdesk")
            .join("ledger.json")
    })
}

fn open_session(config: &AppConfig, store: Option<&Path>) -> Result<Session> {
    let session = Session::new(
        config.strategy.clone(),
        config.position.clone(),
        config.session.clone(),
    )
    .context("failed to create session")?;
    Ok(match store {
        Some(path) => {
            tracing::debug!(path = %path.display(), "using ledger file");
            session.with_store(Box::new(JsonFileStore::open(path)))
        }
        None => session,
    })
}

fn run_backtest_cmd(
    config: &AppConfig,
    data: &DataArgs,
    output_dir: Option<&Path>,
    json: bool,
) -> Result<()> {
    let candles = load_data(config, data)?;
    let report = BacktestReport::run(&candles, &config.backtest)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_text());
    }

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&report, dir)?;
        println!("artifacts written to {}", run_dir.display());
    }
    Ok(())
}

fn run_session_cmd(
    config: &AppConfig,
    candles: &[Candle],
    args: &ReplayArgs,
    store: &StoreArgs,
) -> Result<()> {
    let path = (!args.no_persist).then(|| store_path(store));
    let session = open_session(config, path.as_deref())?;
    let opts = ReplayOptions {
        backfill: args.backfill,
        ticks_per_candle: args.ticks,
    };
    let session = replay(session, candles, &opts)?;

    for entry in session.log().iter().take(20) {
        println!("{entry}");
    }
    println!();
    println!("symbol   {} {}", session.symbol(), session.timeframe());
    if let Some(signal) = session.signal() {
        println!("signal   {} ({})", signal.kind, signal.reason);
    }
    match session.position() {
        Some(pos) => println!(
            "position {} @ {:.2} (tp {:.2} / sl {:.2}, pnl {:+.2})",
            pos.side, pos.entry_price, pos.tp, pos.sl, pos.pnl
        ),
        None => println!("position flat (cooldown {})", session.cooldown()),
    }
    print_stats(&session);
    Ok(())
}

fn run_sweep_cmd(config: &AppConfig, data: &DataArgs, top: usize) -> Result<()> {
    let candles = load_data(config, data)?;
    let entries = run_sweep(&candles, &ParamGrid::default(), &config.backtest);
    if entries.is_empty() {
        bail!("sweep grid produced no valid configurations");
    }

    println!(
        "{:>8} {:>10} {:>7} {:>7} {:>7} {:>9} {:>9}",
        "oversold", "overbought", "tp%", "sl%", "trades", "win rate", "pnl%"
    );
    for e in entries.iter().take(top) {
        println!(
            "{:>8.1} {:>10.1} {:>7.3} {:>7.3} {:>7} {:>8.2}% {:>+9.3}",
            e.rsi_oversold,
            e.rsi_overbought,
            e.tp_pct * 100.0,
            e.sl_pct * 100.0,
            e.total_trades,
            e.win_rate,
            e.total_pnl_pct
        );
    }
    Ok(())
}

fn run_stats_cmd(config: &AppConfig, store: &StoreArgs, csv: Option<&Path>) -> Result<()> {
    let path = store_path(store);
    let session = open_session(config, Some(&path))?;
    println!("ledger   {}", path.display());
    print_stats(&session);
    println!("{}", export_stats_json(&session.stats())?);

    if let Some(out) = csv {
        let trades = session.ledger().to_vec();
        std::fs::write(out, export_trades_csv(&trades)?)
            .with_context(|| format!("failed to write {}", out.display()))?;
        println!("{} trades written to {}", trades.len(), out.display());
    }
    Ok(())
}

fn run_reset_cmd(config: &AppConfig, store: &StoreArgs) -> Result<()> {
    let path = store_path(store);
    let mut session = open_session(config, Some(&path))?;
    session.reset_ledger()?;
    println!(
        "ledger at {} reset, balance {:.2}",
        path.display(),
        session.balance()
    );
    Ok(())
}

fn print_stats(session: &Session) {
    let stats = session.stats();
    println!("balance  {:.2}", session.balance());
    println!(
        "trades   {} (win rate {:.1}%, pnl {:+.2})",
        stats.trade_count, stats.win_rate, stats.total_pnl
    );
    if !stats.last_results.is_empty() {
        let recent: Vec<String> = stats.last_results.iter().map(|r| r.to_string()).collect();
        println!("recent   {}", recent.join(" "));
    }
}

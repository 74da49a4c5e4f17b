//! PipGuard CLI — replay recorded sessions through the engine.
//!
//! Commands:
//! - `replay` — feed a CSV of position snapshots through the engine, print
//!   one line per tick and a session summary, optionally restoring and
//!   saving engine state
//! - `config` — print the default engine configuration as TOML

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pipguard_core::{Admission, Engine, EngineConfig, Observation, PositionSnapshot, Quote};

#[derive(Parser)]
#[command(
    name = "pipguard",
    about = "PipGuard CLI — breakout, recovery and lot sizing signals for FX positions"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded CSV of position snapshots through the engine.
    Replay {
        /// CSV with columns timestamp,ask,bid,ask_lot,bid_lot,margin,effective_margin[,ask_profit,bid_profit].
        #[arg(long)]
        input: PathBuf,

        /// Engine configuration (TOML). Defaults to the built-in configuration.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Engine state (JSON) to restore before the first row.
        #[arg(long)]
        restore: Option<PathBuf>,

        /// Where to write engine state (JSON) after the last row.
        #[arg(long)]
        save: Option<PathBuf>,

        /// Print only the summary.
        #[arg(long, default_value_t = false)]
        quiet: bool,
    },
    /// Print the default engine configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            input,
            config,
            restore,
            save,
            quiet,
        } => run_replay(&input, config.as_deref(), restore.as_deref(), save.as_deref(), quiet),
        Commands::Config => {
            print!("{}", EngineConfig::default().to_toml()?);
            Ok(())
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pipguard_core=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

// ── Input ────────────────────────────────────────────────────────────

/// One recorded tick: the quote plus the account's position at that time.
#[derive(Debug, Deserialize)]
struct SnapshotRow {
    timestamp: DateTime<Utc>,
    ask: i64,
    bid: i64,
    ask_lot: u64,
    bid_lot: u64,
    margin: i64,
    effective_margin: i64,
    #[serde(default)]
    ask_profit: i64,
    #[serde(default)]
    bid_profit: i64,
}

impl From<SnapshotRow> for PositionSnapshot {
    fn from(row: SnapshotRow) -> Self {
        PositionSnapshot::new(
            Quote::new(row.ask, row.bid, row.timestamp),
            row.ask_lot,
            row.bid_lot,
            row.margin,
            row.effective_margin,
        )
        .with_profits(row.ask_profit, row.bid_profit)
    }
}

fn read_snapshots(path: &Path) -> Result<Vec<PositionSnapshot>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut snapshots = Vec::new();
    for (i, record) in reader.deserialize::<SnapshotRow>().enumerate() {
        // header is line 1
        let row = record.with_context(|| format!("{}: bad row at line {}", path.display(), i + 2))?;
        snapshots.push(row.into());
    }
    Ok(snapshots)
}

// ── Replay ───────────────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq, Eq)]
struct ReplaySummary {
    ticks: usize,
    accepted: usize,
    doubtful: usize,
    out_of_order: usize,
    ask_breakouts: usize,
    bid_breakouts: usize,
    calm_ticks: usize,
    episodes: usize,
    recovered_episodes: usize,
}

/// Drive the engine over recorded snapshots.
///
/// Bookkeeping follows the account: an episode opens on the first tick with
/// a position and closes when the position goes flat, which also clears the
/// range and the breakout direction. The range records every tick with a
/// position and commits when the episode first recovers.
fn replay(
    engine: &mut Engine,
    snapshots: &[PositionSnapshot],
    mut on_tick: impl FnMut(&PositionSnapshot, &Observation),
) -> ReplaySummary {
    let mut summary = ReplaySummary::default();

    for snap in snapshots {
        summary.ticks += 1;

        if snap.has_position() {
            if engine.recovery().is_close() {
                summary.episodes += 1;
            }
            engine.recovery_mut().open(snap);
            engine.range_mut().save(snap);
        } else if engine.recovery().is_open() {
            engine.recovery_mut().close();
            engine.range_mut().reset();
            engine.analyzer_mut().reset_bias();
        }

        let reached_before = engine.recovery().is_reached_recover();
        let obs = engine.observe(snap);

        match obs.admission {
            Admission::Accepted => summary.accepted += 1,
            Admission::Doubtful => summary.doubtful += 1,
            Admission::OutOfOrder => summary.out_of_order += 1,
        }
        if obs.ask_reached {
            summary.ask_breakouts += 1;
        }
        if obs.bid_reached {
            summary.bid_breakouts += 1;
        }
        if obs.calm {
            summary.calm_ticks += 1;
        }
        if !reached_before && obs.recovery.is_some_and(|r| r.reached_recover) {
            summary.recovered_episodes += 1;
            engine.range_mut().apply();
        }

        on_tick(snap, &obs);
    }

    summary
}

fn fmt_opt(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn format_tick(snap: &PositionSnapshot, obs: &Observation) -> String {
    let mut flags = Vec::new();
    if obs.ask_reached {
        flags.push("ASK");
    }
    if obs.bid_reached {
        flags.push("BID");
    }
    if obs.moved {
        flags.push("moved");
    }
    if obs.calm {
        flags.push("calm");
    }
    if obs.at_limit {
        flags.push("limit");
    }

    let recovery = match obs.recovery {
        Some(r) if r.recovered_with_profit => format!("{}% +profit", r.progress),
        Some(r) => format!("{}%", r.progress),
        None => "-".to_string(),
    };

    format!(
        "{} {:>8} {:>8} {:<11} thr {:>8}/{:<8} lots {:>3}/{:<3} next {:>4} rec {:<12} {}",
        snap.quote().timestamp.format("%Y-%m-%d %H:%M:%S"),
        snap.quote().ask,
        snap.quote().bid,
        format!("{:?}", obs.admission),
        fmt_opt(obs.ask_threshold),
        fmt_opt(obs.bid_threshold),
        snap.ask_lot(),
        snap.bid_lot(),
        obs.next_lot,
        recovery,
        flags.join(","),
    )
}

fn run_replay(
    input: &Path,
    config: Option<&Path>,
    restore: Option<&Path>,
    save: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let config = match config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    let mut engine = match restore {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading state {}", path.display()))?;
            let engine = Engine::from_json(config, &json)?;
            info!(path = %path.display(), quotes = engine.analyzer().len(), "engine state restored");
            engine
        }
        None => Engine::new(config)?,
    };

    let snapshots = read_snapshots(input)?;
    if snapshots.is_empty() {
        bail!("no rows in {}", input.display());
    }
    info!(rows = snapshots.len(), input = %input.display(), "replaying");

    let summary = replay(&mut engine, &snapshots, |snap, obs| {
        if !quiet {
            println!("{}", format_tick(snap, obs));
        }
    });
    print_summary(&summary, &engine);

    if let Some(path) = save {
        fs::write(path, engine.to_json()?)
            .with_context(|| format!("writing state {}", path.display()))?;
        println!("State saved to: {}", path.display());
    }
    Ok(())
}

fn print_summary(summary: &ReplaySummary, engine: &Engine) {
    println!();
    println!("=== Replay Summary ===");
    println!("Ticks:          {}", summary.ticks);
    println!("Accepted:       {}", summary.accepted);
    println!("Doubtful:       {}", summary.doubtful);
    println!("Out of order:   {}", summary.out_of_order);
    println!("Ask breakouts:  {}", summary.ask_breakouts);
    println!("Bid breakouts:  {}", summary.bid_breakouts);
    println!("Calm ticks:     {}", summary.calm_ticks);
    println!(
        "Episodes:       {} ({} recovered)",
        summary.episodes, summary.recovered_episodes
    );
    println!();
    println!("--- Final State ---");
    println!("Window quotes:  {}", engine.analyzer().len());
    println!(
        "Thresholds:     {} / {}",
        fmt_opt(engine.analyzer().ask_threshold()),
        fmt_opt(engine.analyzer().bid_threshold())
    );
    println!(
        "Range:          {} / {}",
        fmt_opt(engine.range().upper_limit()),
        fmt_opt(engine.range().lower_limit())
    );
    println!("Lot limit:      {}", engine.lots().limit());
    println!("Profit target:  {}", engine.profit_target().name());
}

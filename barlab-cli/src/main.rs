//! BarLab CLI — replay bar feeds and inspect bar-state flags.
//!
//! Commands:
//! - `replay` — load bars from CSV (or a TOML config), build a feed with an
//!   optional realtime tail, replay through the built-in flag-trace handler
//! - `synth` — generate a seeded random-walk CSV for experiments

mod config;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use barlab_core::data::{generate, load_bars, write_bars, FeedBuilder, SyntheticConfig};
use barlab_core::domain::Bar;
use barlab_core::engine::{
    BarState, Drawing, HandlerCtx, HandlerError, RunSummary, RunnerConfig, ScriptRunner,
    StateRecord, UpdateHandler, VarScope,
};
use barlab_core::fingerprint::ReplayFingerprint;
use config::ReplayFileConfig;

#[derive(Parser)]
#[command(name = "barlab", about = "BarLab CLI — bar replay with realtime semantics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a CSV bar series through the built-in flag-trace handler.
    Replay {
        /// Path to a CSV bar file (date,open,high,low,close,volume).
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Path to a TOML replay config (mutually exclusive with --csv).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Deliver the trailing N bars as realtime.
        #[arg(long, default_value_t = 0)]
        realtime_bars: usize,

        /// Revisions per realtime bar, not counting the close.
        #[arg(long, default_value_t = 4)]
        updates_per_bar: u32,

        /// Seed for synthesized intrabar revisions.
        #[arg(long, default_value_t = 7)]
        seed: u64,

        /// Print the per-event flag table.
        #[arg(long, default_value_t = false)]
        trace: bool,

        /// Drawing ring capacity.
        #[arg(long, default_value_t = 50)]
        max_drawings: usize,
    },
    /// Generate a synthetic random-walk CSV.
    Synth {
        /// Number of bars to generate.
        #[arg(long, default_value_t = 252)]
        bars: usize,

        /// Starting price.
        #[arg(long, default_value_t = 100.0)]
        start_price: f64,

        /// Per-bar drift.
        #[arg(long, default_value_t = 0.0005)]
        drift: f64,

        /// Per-bar volatility.
        #[arg(long, default_value_t = 0.012)]
        vol: f64,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// First bar date (YYYY-MM-DD).
        #[arg(long, default_value = "2024-01-02")]
        start: String,

        /// Output CSV path.
        #[arg(long, default_value = "bars.csv")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::Replay {
            csv,
            config,
            realtime_bars,
            updates_per_bar,
            seed,
            trace,
            max_drawings,
        } => run_replay(
            csv,
            config,
            realtime_bars,
            updates_per_bar,
            seed,
            trace,
            max_drawings,
        ),
        Commands::Synth {
            bars,
            start_price,
            drift,
            vol,
            seed,
            start,
            out,
        } => run_synth(bars, start_price, drift, vol, seed, &start, out),
    }
}

/// Env-gated stderr logging: set BARLAB_LOG (RUST_LOG syntax) to enable.
fn init_logging() {
    if let Ok(filter) = std::env::var("BARLAB_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}

/// Built-in handler: tracks the latest close in a rolling variable, records
/// the confirmed high-water mark persistently, and marks each confirmed bar
/// with a drawing.
struct FlagTraceHandler;

impl UpdateHandler for FlagTraceHandler {
    fn name(&self) -> &str {
        "flag-trace"
    }

    fn on_update(
        &mut self,
        bar: &Bar,
        state: &BarState,
        ctx: &mut HandlerCtx<'_>,
    ) -> Result<(), HandlerError> {
        ctx.vars
            .set("last_close", VarScope::Rolling, serde_json::json!(bar.close));
        if state.is_confirmed {
            ctx.vars.set(
                "confirmed_through",
                VarScope::Persistent,
                serde_json::json!(bar.index),
            );
            ctx.drawings.place(Drawing {
                label: "close".into(),
                bar_index: bar.index,
                value: bar.close,
            });
        }
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn run_replay(
    csv: Option<PathBuf>,
    config_path: Option<PathBuf>,
    realtime_bars: usize,
    updates_per_bar: u32,
    seed: u64,
    trace: bool,
    max_drawings: usize,
) -> Result<()> {
    if csv.is_some() && config_path.is_some() {
        bail!("--csv and --config are mutually exclusive");
    }

    let (csv_path, realtime_bars, updates_per_bar, seed, record_trace, max_drawings) =
        match config_path {
            Some(path) => {
                let file = ReplayFileConfig::from_file(&path)?;
                (
                    file.feed.csv,
                    file.feed.realtime_bars,
                    file.feed.updates_per_bar,
                    file.feed.seed,
                    file.runner.record_trace || trace,
                    file.runner.max_drawings,
                )
            }
            None => match csv {
                Some(path) => (path, realtime_bars, updates_per_bar, seed, trace, max_drawings),
                None => bail!("one of --csv or --config is required"),
            },
        };

    let bars = load_bars(&csv_path)
        .with_context(|| format!("load bars from {}", csv_path.display()))?;
    let bar_count = bars.len();
    tracing::info!(bars = bar_count, realtime_bars, "loaded bar series");

    let mut feed = FeedBuilder::new()
        .realtime_bars(realtime_bars)
        .updates_per_bar(updates_per_bar)
        .seed(seed)
        .build(bars);

    let runner_config = RunnerConfig {
        record_trace,
        max_drawings,
    };
    let runner = ScriptRunner::new(runner_config.clone());
    let mut handler = FlagTraceHandler;

    let summary = runner
        .run(&mut feed, &mut handler)
        .context("replay failed")?;

    if record_trace {
        print_trace(&summary.trace);
    }
    print_summary(&summary, bar_count, &csv_path.display().to_string());

    let replay_id = ReplayFingerprint {
        feed: summary.feed_fingerprint.clone(),
        handler: handler.name().to_string(),
        record_trace: runner_config.record_trace,
        max_drawings: runner_config.max_drawings,
    };
    println!("Replay id:      {}", replay_id.hash());

    Ok(())
}

fn run_synth(
    bars: usize,
    start_price: f64,
    drift: f64,
    volatility: f64,
    seed: u64,
    start: &str,
    out: PathBuf,
) -> Result<()> {
    let start_date = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("bad start date {start:?}"))?;

    let series = generate(&SyntheticConfig {
        bars,
        start_price,
        drift,
        volatility,
        seed,
        start_date,
    });
    write_bars(&out, &series).with_context(|| format!("write {}", out.display()))?;

    println!("Wrote {} bars to {}", series.len(), out.display());
    Ok(())
}

fn flag(on: bool) -> char {
    if on {
        'T'
    } else {
        '.'
    }
}

fn print_trace(trace: &[StateRecord]) {
    println!(
        "{:<7} {:<8} {:>4}  {:^3} {:^3} {:^3} {:^3} {:^3} {:^3} {:^3}",
        "Index", "Kind", "Upd", "Fst", "Lst", "His", "Rt", "New", "Cnf", "LCH"
    );
    println!("{}", "-".repeat(54));
    for record in trace {
        let kind = if !record.position.is_realtime {
            "hist"
        } else if record.position.closing {
            "close"
        } else {
            "update"
        };
        println!(
            "{:<7} {:<8} {:>4}  {:^3} {:^3} {:^3} {:^3} {:^3} {:^3} {:^3}",
            record.position.bar_index,
            kind,
            record.position.update_count,
            flag(record.state.is_first),
            flag(record.state.is_last),
            flag(record.state.is_history),
            flag(record.state.is_realtime),
            flag(record.state.is_new),
            flag(record.state.is_confirmed),
            flag(record.state.is_last_confirmed_history),
        );
    }
    println!();
}

fn print_summary(summary: &RunSummary, source_bars: usize, source: &str) {
    println!();
    println!("=== Replay Result ===");
    println!("Source:         {source} ({source_bars} bars)");
    println!("Market:         {}", if summary.market_open { "open" } else { "closed" });
    println!("Events:         {}", summary.event_count);
    println!(
        "Bars:           {} confirmed ({} realtime)",
        summary.bar_count, summary.realtime_bar_count
    );
    println!("Realtime upds:  {}", summary.realtime_update_count);
    println!(
        "Drawings:       {} committed, {} evicted",
        summary.drawings_committed, summary.drawings_evicted
    );
    println!("Feed hash:      {}", summary.feed_fingerprint);

    if summary.faults.is_empty() {
        println!("Faults:         none");
    } else {
        println!("Faults:         {}", summary.faults.len());
        for fault in &summary.faults {
            println!(
                "  bar {} update {}{}: {}",
                fault.bar_index,
                fault.update_count,
                if fault.closing { " (close)" } else { "" },
                fault.message
            );
        }
    }
}

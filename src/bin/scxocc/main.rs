//! scxocc - Normalize scheduler simulation results into occupancy data.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use scx_occupancy::config::parse_fraction_ceiling;
use scx_occupancy::{
    load_document, OccupancyConfig, Results, RunComparison, RunDocument, RunOccupancy,
    RunPayload, RunSummary,
};

/// Normalize scheduler simulation results into occupancy series.
#[derive(Parser)]
#[command(name = "scxocc")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Upper bound of the range in which declared samples are fractions.
    ///
    /// Falls back to SCX_OCC_FRACTION_CEILING, then 1.01.
    #[arg(long, global = true, env = "SCX_OCC_FRACTION_CEILING", value_parser = parse_fraction_ceiling)]
    fraction_ceiling: Option<f64>,

    /// Keep degenerate declared series instead of rebuilding them from the
    /// trace.
    #[arg(long, global = true)]
    no_trace_fallback: bool,

    /// Print compact JSON instead of pretty-printed JSON.
    #[arg(long, global = true)]
    compact: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Occupancy series of a single run.
    Series {
        /// Result payload, compare bundle, or saved run.
        file: PathBuf,

        /// Override the declared total time.
        #[arg(long)]
        total_time: Option<f64>,

        /// Pick a side of a compare bundle.
        #[arg(long, value_parser = ["baseline", "memory_aware"])]
        side: Option<String>,
    },
    /// Per-pid occupancy matrix and pid list.
    PerPid {
        file: PathBuf,

        #[arg(long, value_parser = ["baseline", "memory_aware"])]
        side: Option<String>,
    },
    /// Baseline vs memory-aware series on one time axis.
    Compare { file: PathBuf },
    /// Summary statistics and diagnostics.
    Summary { file: PathBuf },
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run(&cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut cfg = OccupancyConfig::from_env();
    if let Some(ceiling) = cli.fraction_ceiling {
        cfg.fraction_ceiling = ceiling;
    }
    if cli.no_trace_fallback {
        cfg.trace_fallback = false;
    }

    match &cli.command {
        Command::Series {
            file,
            total_time,
            side,
        } => {
            let doc = load(file)?;
            let mut payload = pick_run(&doc, side.as_deref())?.clone();
            if let Some(total) = total_time {
                if !(total.is_finite() && *total > 0.0) {
                    bail!("--total-time must be a positive number, got {total}");
                }
                payload.total_time = Some(*total);
            }
            let occ = RunOccupancy::build(&payload, &doc.processes, &cfg);
            emit(cli, &occ.series)
        }
        Command::PerPid { file, side } => {
            let doc = load(file)?;
            let occ = RunOccupancy::build(pick_run(&doc, side.as_deref())?, &doc.processes, &cfg);
            emit(cli, &occ.per_pid)
        }
        Command::Compare { file } => {
            let doc = load(file)?;
            let Results::Compare(bundle) = &doc.results else {
                bail!("{} holds a single run, not a baseline/memory_aware pair", file.display());
            };
            let cmp = RunComparison::build(bundle, &doc.processes, &cfg);
            emit(cli, &CompareOutput {
                points: &cmp.aligned.points,
                diagnostics: &cmp.diagnostics,
            })
        }
        Command::Summary { file } => {
            let doc = load(file)?;
            let summarize = |run: &RunPayload| {
                let occ = RunOccupancy::build(run, &doc.processes, &cfg);
                SummaryOutput {
                    source: occ.source,
                    summary: RunSummary::new(run, &occ),
                    diagnostics: occ.diagnostics,
                }
            };
            match &doc.results {
                Results::Single(run) => emit(cli, &summarize(run)),
                Results::Compare(bundle) => emit(cli, &CompareSummary {
                    baseline: summarize(&bundle.baseline),
                    memory_aware: summarize(&bundle.memory_aware),
                }),
            }
        }
    }
}

#[derive(Serialize)]
struct CompareOutput<'a> {
    points: &'a [scx_occupancy::AlignedPoint],
    diagnostics: &'a [scx_occupancy::Diagnostic],
}

#[derive(Serialize)]
struct SummaryOutput {
    source: scx_occupancy::SourceKind,
    summary: RunSummary,
    diagnostics: Vec<scx_occupancy::Diagnostic>,
}

#[derive(Serialize)]
struct CompareSummary {
    baseline: SummaryOutput,
    memory_aware: SummaryOutput,
}

fn load(path: &Path) -> Result<RunDocument> {
    load_document(path).with_context(|| format!("failed to load {}", path.display()))
}

fn pick_run<'a>(doc: &'a RunDocument, side: Option<&str>) -> Result<&'a RunPayload> {
    match (&doc.results, side) {
        (Results::Single(run), None) => Ok(run),
        (Results::Single(_), Some(side)) => bail!("--side {side} given but the document holds a single run"),
        (Results::Compare(bundle), None | Some("baseline")) => Ok(&bundle.baseline),
        (Results::Compare(bundle), Some("memory_aware")) => Ok(&bundle.memory_aware),
        (Results::Compare(_), Some(other)) => bail!("unknown side {other:?}"),
    }
}

fn emit<T: Serialize>(cli: &Cli, value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if cli.compact {
        serde_json::to_writer(&mut out, value)?;
    } else {
        serde_json::to_writer_pretty(&mut out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

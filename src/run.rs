//! Per-run occupancy pipeline.
//!
//! A run may carry several sources at once. [`RunSource::resolve`] picks one
//! in a fixed order:
//!
//! 1. declared samples, unless they are degenerate and a trace can replace
//!    them
//! 2. the interval timeline
//! 3. the raw trace
//!
//! The first source with data wins. Everything downstream dispatches on the
//! resolved variant.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::align::{align_series, AlignedSeries};
use crate::config::OccupancyConfig;
use crate::payload::{CompareBundle, RunPayload};
use crate::per_pid::PerPidMatrix;
use crate::series::OccupancySeries;
use crate::trace::reconstruct_intervals;
use crate::types::{Interval, Pid};

/// Non-fatal signals attached to pipeline outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Declared samples were flat at `value` (all 0 or all 100).
    DegenerateSamples {
        value: f64,
        /// The series was rebuilt from the run's trace.
        replaced_by_trace: bool,
    },
    /// Both compared series were identical.
    IdenticalSeries { len: usize },
}

/// Where a run's occupancy series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    DeclaredSamples,
    IntervalTimeline,
    RawTrace,
    Empty,
}

/// The data source chosen for a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunSource {
    /// Declared samples, already scaled and bucketed.
    DeclaredSamples(OccupancySeries),
    /// Canonical intervals from the payload's timeline.
    IntervalTimeline(Vec<Interval>),
    /// Intervals reconstructed from the payload's trace.
    RawTrace(Vec<Interval>),
    Empty,
}

impl RunSource {
    /// Choose the source for `run`, returning any diagnostics raised while
    /// choosing.
    pub fn resolve(run: &RunPayload, cfg: &OccupancyConfig) -> (Self, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();

        let declared = OccupancySeries::from_samples(&run.samples, run.total_time, cfg);
        if declared.has_values() {
            match declared.degenerate_value() {
                None => return (RunSource::DeclaredSamples(declared), diagnostics),
                Some(value) => {
                    let rebuilt = if cfg.trace_fallback {
                        reconstruct_intervals(&run.trace, run.total_time)
                    } else {
                        Vec::new()
                    };
                    let replaced_by_trace = !rebuilt.is_empty();
                    warn!(
                        value,
                        replaced_by_trace, "declared cpu series is flat"
                    );
                    diagnostics.push(Diagnostic::DegenerateSamples {
                        value,
                        replaced_by_trace,
                    });
                    let source = if replaced_by_trace {
                        RunSource::RawTrace(rebuilt)
                    } else {
                        RunSource::DeclaredSamples(declared)
                    };
                    return (source, diagnostics);
                }
            }
        }

        if !run.timeline.is_empty() {
            return (RunSource::IntervalTimeline(run.timeline.clone()), diagnostics);
        }
        if !run.trace.is_empty() {
            return (
                RunSource::RawTrace(reconstruct_intervals(&run.trace, run.total_time)),
                diagnostics,
            );
        }
        (RunSource::Empty, diagnostics)
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            RunSource::DeclaredSamples(_) => SourceKind::DeclaredSamples,
            RunSource::IntervalTimeline(_) => SourceKind::IntervalTimeline,
            RunSource::RawTrace(_) => SourceKind::RawTrace,
            RunSource::Empty => SourceKind::Empty,
        }
    }
}

/// Canonical intervals for a run: the timeline when present, else the
/// trace reconstruction. Used where per-process detail is needed regardless
/// of which source drives the aggregate series.
pub fn run_intervals(run: &RunPayload) -> Vec<Interval> {
    if !run.timeline.is_empty() {
        run.timeline.clone()
    } else {
        reconstruct_intervals(&run.trace, run.total_time)
    }
}

/// Everything derived from one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOccupancy {
    pub source: SourceKind,
    pub intervals: Vec<Interval>,
    pub series: OccupancySeries,
    pub per_pid: PerPidMatrix,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunOccupancy {
    pub fn build(run: &RunPayload, processes: &[Pid], cfg: &OccupancyConfig) -> Self {
        let (source, diagnostics) = RunSource::resolve(run, cfg);
        let kind = source.kind();

        let (series, intervals) = match source {
            RunSource::DeclaredSamples(series) => (series, run_intervals(run)),
            RunSource::IntervalTimeline(intervals) | RunSource::RawTrace(intervals) => (
                OccupancySeries::from_intervals(&intervals, run.total_time),
                intervals,
            ),
            RunSource::Empty => (OccupancySeries::default(), Vec::new()),
        };
        let per_pid = PerPidMatrix::build(&intervals, run.total_time, processes);

        debug!(
            source = ?kind,
            buckets = series.len(),
            intervals = intervals.len(),
            pids = per_pid.pids().len(),
            "built run occupancy"
        );

        Self {
            source: kind,
            intervals,
            series,
            per_pid,
            diagnostics,
        }
    }
}

/// Two runs side by side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunComparison {
    pub baseline: RunOccupancy,
    pub memory_aware: RunOccupancy,
    pub aligned: AlignedSeries,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunComparison {
    pub fn from_runs(baseline: RunOccupancy, memory_aware: RunOccupancy) -> Self {
        let aligned = align_series(&baseline.series, &memory_aware.series);
        let mut diagnostics = Vec::new();
        if aligned.identical {
            diagnostics.push(Diagnostic::IdenticalSeries {
                len: baseline.series.len(),
            });
        }
        Self {
            baseline,
            memory_aware,
            aligned,
            diagnostics,
        }
    }

    pub fn build(bundle: &CompareBundle, processes: &[Pid], cfg: &OccupancyConfig) -> Self {
        Self::from_runs(
            RunOccupancy::build(&bundle.baseline, processes, cfg),
            RunOccupancy::build(&bundle.memory_aware, processes, cfg),
        )
    }
}

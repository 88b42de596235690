//! scx_occupancy - Normalize scheduler simulation results into CPU occupancy.
//!
//! Simulation services report each run in whatever shape their producer
//! chose: declared utilization samples, per-process interval timelines, or
//! raw `running`/`stopped` traces. This crate turns any of them into one
//! canonical form that charts can consume directly.
//!
//! # Architecture
//!
//! - **Idle**: the single rule deciding whether a pid is the idle slot
//! - **Timeline**: shape sniffing for interval encodings
//! - **Trace**: interval reconstruction from event logs, and the inverse
//! - **Series**: per-bucket busy/idle rasterization and declared-sample
//!   scaling, with degeneracy detection
//! - **PerPid**: time x pid occupancy matrix
//! - **Align**: two-run comparison over the union of time keys
//! - **Run / Cache**: source selection per run, memoized by run identity
//!
//! Every builder is pure and total: malformed input degrades to "no data"
//! for the smallest affected unit and never fails.
//!
//! # Usage
//!
//! ```rust
//! use scx_occupancy::*;
//! use serde_json::json;
//!
//! let run = RunPayload::from_value(&json!({
//!     "total_time": 4,
//!     "timeline": [["P1", 0, 2], ["P2", 2, 1]],
//! }));
//! let occ = RunOccupancy::build(&run, &[], &OccupancyConfig::default());
//! assert_eq!(occ.series.busy_count(), 3);
//! ```

pub mod align;
pub mod cache;
pub mod config;
pub mod idle;
pub mod payload;
pub mod per_pid;
pub mod run;
pub mod series;
pub mod stats;
pub mod timeline;
pub mod trace;
pub mod types;
mod value;

// Re-export the main public types for convenience.
pub use align::{align_series, AlignedPoint, AlignedSeries};
pub use cache::{OccupancyCache, RunKey};
pub use config::OccupancyConfig;
pub use idle::{is_idle, is_idle_str};
pub use payload::{
    load_document, parse_document, parse_document_str, CompareBundle, PayloadError, Results,
    RunDocument, RunPayload,
};
pub use per_pid::PerPidMatrix;
pub use run::{run_intervals, Diagnostic, RunComparison, RunOccupancy, RunSource, SourceKind};
pub use series::{parse_samples, OccupancySeries};
pub use stats::{DistributionStats, PidStats, RunSummary};
pub use timeline::{detect_shape, normalize_timeline, TimelineShape};
pub use trace::{parse_events, reconstruct_intervals, synthesize_trace};
pub use types::{Bucket, Event, EventKind, Interval, OccupancyPoint, Pid, SamplePoint, Time};

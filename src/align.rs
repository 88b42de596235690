//! Side-by-side alignment of two occupancy series.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::series::OccupancySeries;
use crate::types::Bucket;

/// One bucket of a two-run comparison. `None` means the run has no
/// measurement at this time, which is not the same as 0 (known idle).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignedPoint {
    pub time: Bucket,
    pub a: Option<f64>,
    pub b: Option<f64>,
}

/// Result of [`align_series`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignedSeries {
    pub points: Vec<AlignedPoint>,
    /// Both inputs were non-empty and equal point for point. Busy/idle
    /// rasters of two work-conserving runs may legitimately match.
    pub identical: bool,
}

/// Merge two series over the union of their time keys, ascending.
///
/// If a series repeats a time key, its last point wins.
pub fn align_series(a: &OccupancySeries, b: &OccupancySeries) -> AlignedSeries {
    let mut merged: BTreeMap<Bucket, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for p in a.points() {
        merged.entry(p.time).or_default().0 = p.cpu;
    }
    for p in b.points() {
        merged.entry(p.time).or_default().1 = p.cpu;
    }

    let identical = !a.is_empty() && a == b;
    if identical {
        warn!(
            len = a.len(),
            "compared series are identical"
        );
    }

    AlignedSeries {
        points: merged
            .into_iter()
            .map(|(time, (a, b))| AlignedPoint { time, a, b })
            .collect(),
        identical,
    }
}

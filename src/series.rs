//! CPU occupancy series.
//!
//! An [`OccupancySeries`] holds one point per integer time bucket in
//! `[0, len)`. Built from intervals, every bucket is either busy (100) or
//! idle (0). Built from declared samples, buckets carry the declared
//! percentage, or `None` where nothing was measured.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::OccupancyConfig;
use crate::types::{Bucket, Interval, OccupancyPoint, SamplePoint, Time, BUSY, IDLE};
use crate::value::{finite, first_finite};

/// Series longer than this are truncated. A payload claiming a total time in
/// the billions would otherwise allocate without bound.
pub const MAX_BUCKETS: usize = 1 << 22;

const SAMPLE_TIME_KEYS: &[&str] = &["time", "t", "x"];
const SAMPLE_CPU_KEYS: &[&str] = &["cpu", "value", "y", "v"];

/// Number of buckets covering `[0, observed_end)`, or `[0, total_time)`
/// when a usable total time was declared.
pub fn series_len(total_time: Option<Time>, observed_end: Time) -> usize {
    let span = match total_time.filter(|t| t.is_finite() && *t > 0.0) {
        Some(total) => total,
        None => observed_end,
    };
    if !(span > 0.0) {
        return 0;
    }
    let len = span.ceil();
    if len > MAX_BUCKETS as f64 {
        warn!(span, max = MAX_BUCKETS, "occupancy series truncated");
        return MAX_BUCKETS;
    }
    len as usize
}

/// Parse declared utilization samples.
///
/// Accepted record encodings: `[time, cpu]` pairs, objects keyed by
/// `time|t|x` and `cpu|value|y|v`, and bare numbers (or `null`) whose index
/// is the time. Object fields take the first alias holding a finite number.
/// Records without a finite time are dropped; an unreadable cpu becomes
/// `None`.
pub fn parse_samples(series: &Value) -> Vec<SamplePoint> {
    let Some(records) = series.as_array() else {
        return Vec::new();
    };

    let samples: Vec<SamplePoint> = records
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| match record {
            Value::Number(_) => Some(SamplePoint {
                time: idx as f64,
                cpu: finite(record),
            }),
            Value::Null => Some(SamplePoint {
                time: idx as f64,
                cpu: None,
            }),
            Value::Array(pair) if pair.len() >= 2 => Some(SamplePoint {
                time: finite(&pair[0])?,
                cpu: finite(&pair[1]),
            }),
            Value::Object(obj) => Some(SamplePoint {
                time: first_finite(obj, SAMPLE_TIME_KEYS)?,
                cpu: first_finite(obj, SAMPLE_CPU_KEYS),
            }),
            _ => None,
        })
        .collect();

    if samples.len() < records.len() {
        debug!(
            kept = samples.len(),
            dropped = records.len() - samples.len(),
            "parsed cpu samples"
        );
    }
    samples
}

/// A per-bucket occupancy series over `[0, len)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OccupancySeries {
    points: Vec<OccupancyPoint>,
}

impl OccupancySeries {
    pub fn new(points: Vec<OccupancyPoint>) -> Self {
        Self { points }
    }

    /// Rasterize canonical intervals into busy/idle buckets.
    ///
    /// Bucket `t` is busy when some non-idle interval covers any part of
    /// `[t, t + 1)`. Length comes from `total_time` when usable, else from
    /// the latest interval end.
    pub fn from_intervals(intervals: &[Interval], total_time: Option<Time>) -> Self {
        let observed_end = intervals
            .iter()
            .map(|iv| iv.end)
            .filter(|e| e.is_finite())
            .fold(0.0, f64::max);
        let len = series_len(total_time, observed_end);

        let mut busy = vec![false; len];
        for iv in intervals.iter().filter(|iv| !iv.pid.is_idle()) {
            for slot in &mut busy[iv.buckets(len)] {
                *slot = true;
            }
        }

        Self::new(
            busy.into_iter()
                .enumerate()
                .map(|(t, b)| OccupancyPoint {
                    time: t as Bucket,
                    cpu: Some(if b { BUSY } else { IDLE }),
                })
                .collect(),
        )
    }

    /// Build a series from declared samples.
    ///
    /// Fractions (maximum in `(0, fraction_ceiling]`) are scaled to
    /// percentages, then every value is clamped to `[0, 100]`. Each sample
    /// lands in bucket `floor(time)`; a later sample for the same bucket
    /// wins. Buckets without a sample are `None`.
    pub fn from_samples(
        samples: &[SamplePoint],
        total_time: Option<Time>,
        cfg: &OccupancyConfig,
    ) -> Self {
        let usable: Vec<&SamplePoint> = samples
            .iter()
            .filter(|s| s.time.is_finite() && s.time >= 0.0)
            .collect();

        let max_cpu = usable
            .iter()
            .filter_map(|s| s.cpu)
            .filter(|c| c.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        let scale = if max_cpu > 0.0 && max_cpu <= cfg.fraction_ceiling {
            100.0
        } else {
            1.0
        };

        let observed_end = usable
            .iter()
            .map(|s| s.time.floor() + 1.0)
            .fold(0.0, f64::max);
        let len = series_len(total_time, observed_end);

        let mut values: Vec<Option<f64>> = vec![None; len];
        for s in usable {
            let bucket = s.time.floor() as usize;
            if bucket >= len {
                continue;
            }
            values[bucket] = s
                .cpu
                .filter(|c| c.is_finite())
                .map(|c| (c * scale).clamp(IDLE, BUSY));
        }

        Self::new(
            values
                .into_iter()
                .enumerate()
                .map(|(t, cpu)| OccupancyPoint {
                    time: t as Bucket,
                    cpu,
                })
                .collect(),
        )
    }

    pub fn points(&self) -> &[OccupancyPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether any bucket carries a measured value.
    pub fn has_values(&self) -> bool {
        self.points.iter().any(|p| p.cpu.is_some())
    }

    /// Number of buckets with a measured value above zero.
    pub fn busy_count(&self) -> usize {
        self.points
            .iter()
            .filter(|p| p.cpu.is_some_and(|c| c > 0.0))
            .count()
    }

    /// The flat value of a degenerate series.
    ///
    /// A series is degenerate when it has at least one measured value and
    /// every measured value is exactly 0 or every one is exactly 100. Real
    /// telemetry rarely looks like that; a hard-coded placeholder usually
    /// does. The check cannot tell the two apart.
    pub fn degenerate_value(&self) -> Option<f64> {
        let mut present = self.points.iter().filter_map(|p| p.cpu);
        let first = present.next()?;
        if first != IDLE && first != BUSY {
            return None;
        }
        present.all(|c| c == first).then_some(first)
    }
}

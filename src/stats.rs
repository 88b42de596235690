//! Summary statistics for a normalized run.
//!
//! These complement the display-only metrics a simulation service reports
//! (`cpu_utilization`, `context_switches`, ...) with values recomputed from
//! the canonical data, so a report can show both side by side.
//!
//! # Metrics Computed
//!
//! - **Utilization**: mean of measured bucket values of the series
//! - **Context switches**: pid changes between consecutive intervals
//! - **Slice durations**: per-pid and overall distribution of interval lengths
//! - **Completion**: per-pid first start and last end
//! - **Averages** of the reported waiting and turnaround maps

use std::collections::BTreeMap;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::payload::RunPayload;
use crate::run::RunOccupancy;
use crate::series::OccupancySeries;
use crate::types::{Interval, Pid, Time};

/// Summary statistics for a distribution of values.
///
/// Serializes as `{count, min, max, sum, mean, stddev}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistributionStats {
    /// Number of samples.
    pub count: usize,
    /// Minimum value (or 0 if empty).
    pub min: f64,
    /// Maximum value (or 0 if empty).
    pub max: f64,
    /// Sum of all values.
    pub sum: f64,
    sum_sq: f64,
}

impl DistributionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    /// Mean value (or 0 if empty).
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Standard deviation (or 0 if empty or single sample).
    pub fn stddev(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            let mean = self.mean();
            let variance = (self.sum_sq / self.count as f64) - (mean * mean);
            variance.max(0.0).sqrt()
        }
    }
}

impl Serialize for DistributionStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("DistributionStats", 6)?;
        s.serialize_field("count", &self.count)?;
        s.serialize_field("min", &self.min)?;
        s.serialize_field("max", &self.max)?;
        s.serialize_field("sum", &self.sum)?;
        s.serialize_field("mean", &self.mean())?;
        s.serialize_field("stddev", &self.stddev())?;
        s.end()
    }
}

/// Per-pid statistics from canonical intervals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PidStats {
    pub pid: Pid,
    /// Slice lengths of this pid.
    pub slices: DistributionStats,
    pub first_start: Time,
    pub completion: Time,
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub buckets: usize,
    pub busy_buckets: usize,
    /// Mean of measured bucket values, in percent. `None` when the series
    /// has no measured bucket.
    pub utilization: Option<f64>,
    pub context_switches: usize,
    pub slices: DistributionStats,
    pub pids: Vec<PidStats>,
    /// `cpu_utilization` as reported by the producer.
    pub reported_utilization: Option<f64>,
    /// `context_switches` as reported by the producer.
    pub reported_context_switches: Option<f64>,
    pub avg_wait: Option<f64>,
    pub avg_turnaround: Option<f64>,
}

impl RunSummary {
    pub fn new(run: &RunPayload, occ: &RunOccupancy) -> Self {
        let mut slices = DistributionStats::new();
        for iv in &occ.intervals {
            slices.add(iv.duration());
        }

        Self {
            buckets: occ.series.len(),
            busy_buckets: occ.series.busy_count(),
            utilization: utilization(&occ.series),
            context_switches: context_switches(&occ.intervals),
            slices,
            pids: pid_stats(&occ.intervals),
            reported_utilization: run.metric("cpu_utilization"),
            reported_context_switches: run.metric("context_switches"),
            avg_wait: mean_of(&run.metric_map("waiting_times")),
            avg_turnaround: mean_of(&run.metric_map("turnaround_times")),
        }
    }
}

/// Mean of the measured bucket values, in percent.
///
/// For a busy/idle series this is the busy fraction times 100.
pub fn utilization(series: &OccupancySeries) -> Option<f64> {
    let mut stats = DistributionStats::new();
    for cpu in series.points().iter().filter_map(|p| p.cpu) {
        stats.add(cpu);
    }
    (stats.count > 0).then(|| stats.mean())
}

/// Number of pid changes between consecutive intervals ordered by start.
pub fn context_switches(intervals: &[Interval]) -> usize {
    let mut ordered: Vec<&Interval> = intervals.iter().collect();
    ordered.sort_by(|a, b| a.start.total_cmp(&b.start));
    ordered
        .windows(2)
        .filter(|pair| pair[0].pid != pair[1].pid)
        .count()
}

/// Per-pid slice statistics, ordered by pid.
pub fn pid_stats(intervals: &[Interval]) -> Vec<PidStats> {
    let mut by_pid: BTreeMap<&Pid, PidStats> = BTreeMap::new();
    for iv in intervals {
        let entry = by_pid.entry(&iv.pid).or_insert_with(|| PidStats {
            pid: iv.pid.clone(),
            slices: DistributionStats::new(),
            first_start: iv.start,
            completion: iv.end,
        });
        entry.slices.add(iv.duration());
        entry.first_start = entry.first_start.min(iv.start);
        entry.completion = entry.completion.max(iv.end);
    }
    by_pid.into_values().collect()
}

/// Mean of a metric map's values; `None` when empty.
pub fn mean_of(values: &[(String, f64)]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().map(|(_, v)| v).sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OccupancyConfig;
    use serde_json::json;

    #[test]
    fn test_distribution_stats() {
        let mut d = DistributionStats::new();
        assert_eq!(d.mean(), 0.0);
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            d.add(v);
        }
        assert_eq!(d.count, 8);
        assert_eq!(d.min, 2.0);
        assert_eq!(d.max, 9.0);
        assert_eq!(d.mean(), 5.0);
        assert!((d.stddev() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_slice_spread_in_summary_output() {
        let run = RunPayload::from_value(&json!({
            "timeline": [["P1", 0, 1], ["P2", 1, 4], ["P1", 4, 5], ["P2", 5, 8]],
        }));
        let occ = RunOccupancy::build(&run, &[], &OccupancyConfig::default());
        let out = serde_json::to_value(RunSummary::new(&run, &occ)).unwrap();

        // Slices 1, 3, 1, 3: mean 2, population stddev 1.
        assert_eq!(out["slices"]["count"], json!(4));
        assert_eq!(out["slices"]["mean"], json!(2.0));
        assert_eq!(out["slices"]["stddev"], json!(1.0));
        assert!(out["slices"].get("sum_sq").is_none());

        let p2 = &out["pids"][1];
        assert_eq!(p2["pid"], json!("P2"));
        assert_eq!(p2["slices"]["stddev"], json!(0.0));
    }

    #[test]
    fn test_context_switches() {
        let ivs = vec![
            Interval::new("B", 2.0, 4.0),
            Interval::new("A", 0.0, 2.0),
            Interval::new("B", 4.0, 5.0),
            Interval::new("A", 5.0, 6.0),
        ];
        // Ordered: A, B, B, A
        assert_eq!(context_switches(&ivs), 2);
        assert_eq!(context_switches(&[]), 0);
    }

    #[test]
    fn test_mean_of() {
        assert_eq!(mean_of(&[]), None);
        assert_eq!(
            mean_of(&[("P1".into(), 2.0), ("P2".into(), 4.0)]),
            Some(3.0)
        );
    }

    #[test]
    fn test_run_summary() {
        let run = RunPayload::from_value(&json!({
            "total_time": 5,
            "timeline": [["P1", 0, 2], ["P2", 2, 3], ["P1", 4, 5]],
            "cpu_utilization": 80.0,
            "context_switches": 2,
            "waiting_times": {"P1": 2, "P2": 2},
            "turnaround_times": {"P1": 5, "P2": 3},
        }));
        let occ = RunOccupancy::build(&run, &[], &OccupancyConfig::default());
        let summary = RunSummary::new(&run, &occ);

        assert_eq!(summary.buckets, 5);
        assert_eq!(summary.busy_buckets, 4);
        assert_eq!(summary.utilization, Some(80.0));
        assert_eq!(summary.context_switches, 2);
        assert_eq!(summary.slices.count, 3);
        assert_eq!(summary.reported_utilization, Some(80.0));
        assert_eq!(summary.reported_context_switches, Some(2.0));
        assert_eq!(summary.avg_wait, Some(2.0));
        assert_eq!(summary.avg_turnaround, Some(4.0));

        let p1 = &summary.pids[0];
        assert_eq!(p1.pid, Pid::from("P1"));
        assert_eq!(p1.slices.sum, 3.0);
        assert_eq!(p1.first_start, 0.0);
        assert_eq!(p1.completion, 5.0);
    }

    #[test]
    fn test_utilization_ignores_unmeasured() {
        let run = RunPayload::from_value(&json!({"cpu_series": [50, null, 30]}));
        let occ = RunOccupancy::build(&run, &[], &OccupancyConfig::default());
        assert_eq!(utilization(&occ.series), Some(40.0));
        assert_eq!(utilization(&OccupancySeries::default()), None);
    }
}

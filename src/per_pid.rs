//! Per-process occupancy matrix for stacked views.
//!
//! Rows are time buckets, columns are pids. The column set starts from the
//! run's declared process list and grows whenever an interval names a pid
//! the list did not mention.

use std::collections::HashMap;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::series::series_len;
use crate::types::{Bucket, Interval, Pid, Time};

/// Occupancy of one pid in one bucket.
pub const CELL_BUSY: u8 = 100;
pub const CELL_IDLE: u8 = 0;

/// Time x pid occupancy matrix.
///
/// Cells live in one column-major buffer: column `c` is
/// `cells[c * len .. (c + 1) * len]`. Appending a pid appends a column
/// without touching existing ones.
///
/// An empty matrix (no pids, no rows) means "no per-pid data", which the
/// presentation layer treats differently from an all-zero matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerPidMatrix {
    pids: Vec<Pid>,
    len: usize,
    cells: Vec<u8>,
}

impl PerPidMatrix {
    /// Rasterize intervals into per-pid columns.
    ///
    /// `known_pids` fixes the leading column order; duplicates and idle
    /// entries are skipped. Pids that only appear in `intervals` are
    /// appended in order of first appearance, zero-filled for every bucket
    /// they do not occupy.
    pub fn build(intervals: &[Interval], total_time: Option<Time>, known_pids: &[Pid]) -> Self {
        let mut pids: Vec<Pid> = Vec::with_capacity(known_pids.len());
        let mut index: HashMap<Pid, usize> = HashMap::new();
        for pid in known_pids.iter().filter(|p| !p.is_idle()) {
            if !index.contains_key(pid) {
                index.insert(pid.clone(), pids.len());
                pids.push(pid.clone());
            }
        }

        let active: Vec<&Interval> = intervals.iter().filter(|iv| !iv.pid.is_idle()).collect();
        if active.is_empty() && pids.is_empty() {
            return Self::default();
        }

        let observed_end = active
            .iter()
            .map(|iv| iv.end)
            .filter(|e| e.is_finite())
            .fold(0.0, f64::max);
        let len = series_len(total_time, observed_end);
        let mut cells = vec![CELL_IDLE; len * pids.len()];

        let nr_known = pids.len();
        for iv in active {
            let col = match index.get(&iv.pid) {
                Some(col) => *col,
                None => {
                    let col = pids.len();
                    index.insert(iv.pid.clone(), col);
                    pids.push(iv.pid.clone());
                    cells.resize(cells.len() + len, CELL_IDLE);
                    col
                }
            };
            let column = &mut cells[col * len..(col + 1) * len];
            column[iv.buckets(len)].fill(CELL_BUSY);
        }

        if pids.len() > nr_known {
            debug!(
                known = nr_known,
                discovered = pids.len() - nr_known,
                "per-pid matrix grew past declared processes"
            );
        }

        Self { pids, len, cells }
    }

    pub fn pids(&self) -> &[Pid] {
        &self.pids
    }

    /// Number of time buckets.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty() && self.len == 0
    }

    fn column_slice(&self, col: usize) -> &[u8] {
        &self.cells[col * self.len..(col + 1) * self.len]
    }

    /// Column of `pid` across all buckets.
    pub fn column(&self, pid: &Pid) -> Option<&[u8]> {
        let col = self.pids.iter().position(|p| p == pid)?;
        Some(self.column_slice(col))
    }

    /// Cells of bucket `time`, in [`pids`](Self::pids) order.
    pub fn row(&self, time: usize) -> Option<Vec<u8>> {
        (time < self.len).then(|| {
            (0..self.pids.len())
                .map(|col| self.cells[col * self.len + time])
                .collect()
        })
    }
}

/// Serializes a row as a flat `{time, <pid>: 0|100, ...}` object.
struct RowView<'a> {
    matrix: &'a PerPidMatrix,
    time: usize,
}

impl Serialize for RowView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let m = self.matrix;
        let mut map = serializer.serialize_map(Some(m.pids.len() + 1))?;
        map.serialize_entry("time", &(self.time as Bucket))?;
        for (col, pid) in m.pids.iter().enumerate() {
            map.serialize_entry(pid.as_str(), &m.cells[col * m.len + self.time])?;
        }
        map.end()
    }
}

struct RowsView<'a>(&'a PerPidMatrix);

impl Serialize for RowsView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq((0..self.0.len).map(|time| RowView {
            matrix: self.0,
            time,
        }))
    }
}

impl Serialize for PerPidMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("PerPidMatrix", 2)?;
        s.serialize_field("pids", &self.pids)?;
        s.serialize_field("rows", &RowsView(self))?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::MAX_BUCKETS;
    use serde_json::json;

    fn pids(names: &[&str]) -> Vec<Pid> {
        names.iter().map(|n| Pid::from(*n)).collect()
    }

    #[test]
    fn test_known_pids_columns() {
        let ivs = vec![Interval::new("P1", 0.0, 2.0), Interval::new("P2", 2.0, 3.0)];
        let m = PerPidMatrix::build(&ivs, None, &pids(&["P2", "P1", "P3"]));
        assert_eq!(m.pids(), pids(&["P2", "P1", "P3"]).as_slice());
        assert_eq!(m.len(), 3);
        assert_eq!(m.column(&"P1".into()), Some(&[100, 100, 0][..]));
        assert_eq!(m.column(&"P2".into()), Some(&[0, 0, 100][..]));
        assert_eq!(m.column(&"P3".into()), Some(&[0, 0, 0][..]));
        assert_eq!(m.row(2), Some(vec![100, 0, 0]));
        assert_eq!(m.row(3), None);
    }

    #[test]
    fn test_unknown_pid_appended() {
        let ivs = vec![Interval::new("P1", 0.0, 2.0), Interval::new("P9", 3.0, 5.0)];
        let m = PerPidMatrix::build(&ivs, Some(6.0), &pids(&["P1"]));
        assert_eq!(m.pids(), pids(&["P1", "P9"]).as_slice());
        assert_eq!(m.column(&"P9".into()), Some(&[0, 0, 0, 100, 100, 0][..]));
        assert_eq!(m.column(&"P1".into()), Some(&[100, 100, 0, 0, 0, 0][..]));
        assert!((0..m.len()).all(|t| m.row(t).is_some_and(|r| r.len() == 2)));
    }

    #[test]
    fn test_discovered_when_no_known() {
        let ivs = vec![Interval::new("B", 0.0, 1.0), Interval::new("A", 1.0, 2.4)];
        let m = PerPidMatrix::build(&ivs, None, &[]);
        assert_eq!(m.pids(), pids(&["B", "A"]).as_slice());
        assert_eq!(m.column(&"A".into()), Some(&[0, 100, 100][..]));
    }

    #[test]
    fn test_known_pids_deduped_and_idle_skipped() {
        let m = PerPidMatrix::build(&[], Some(2.0), &pids(&["P1", "idle", "P1", "0"]));
        assert_eq!(m.pids(), pids(&["P1"]).as_slice());
        assert_eq!(m.column(&"P1".into()), Some(&[0, 0][..]));
    }

    #[test]
    fn test_empty_result() {
        let m = PerPidMatrix::build(&[], Some(5.0), &[]);
        assert!(m.is_empty());
        let m = PerPidMatrix::build(&[Interval::new("idle", 0.0, 3.0)], None, &[]);
        assert!(m.is_empty());
    }

    #[test]
    fn test_capped_length_single_buffer() {
        let ivs = vec![Interval::new("P9", 1.0, 3.0)];
        let m = PerPidMatrix::build(&ivs, Some(1e300), &pids(&["P1"]));
        assert_eq!(m.len(), MAX_BUCKETS);
        assert_eq!(m.pids(), pids(&["P1", "P9"]).as_slice());
        assert_eq!(m.cells.len(), 2 * MAX_BUCKETS);
        let p9 = m.column(&"P9".into()).unwrap();
        assert_eq!(&p9[..4], &[0, 100, 100, 0]);
        assert!(p9[3..].iter().all(|c| *c == CELL_IDLE));
    }

    #[test]
    fn test_serialize_flat_rows() {
        let ivs = vec![Interval::new("P1", 0.0, 1.0)];
        let m = PerPidMatrix::build(&ivs, Some(2.0), &pids(&["P1", "P2"]));
        assert_eq!(
            serde_json::to_value(&m).unwrap(),
            json!({
                "pids": ["P1", "P2"],
                "rows": [
                    {"time": 0, "P1": 100, "P2": 0},
                    {"time": 1, "P1": 0, "P2": 0},
                ],
            })
        );
    }
}

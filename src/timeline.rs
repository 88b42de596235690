//! Interval timeline normalization.
//!
//! Producers emit per-process execution intervals in one of several
//! encodings:
//!
//! - tuples: `[pid, start, end]`, or `[pid, start, duration]` when the third
//!   field is not past `start`
//! - objects: `{pid, start, end}`, `{pid, s, e}` or `{pid, start, duration}`
//!
//! [`normalize_timeline`] sniffs the container shape once, then converts
//! each record independently. A record that cannot be read is dropped and
//! the rest of the timeline still normalizes.

use serde_json::{Map, Value};
use tracing::debug;

use crate::types::{Interval, Pid};
use crate::value::finite;

/// Encoding of a timeline container, decided from its first usable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineShape {
    /// `[pid, start, end_or_duration]` arrays.
    Tuples,
    /// Objects keyed by `start`/`end`, `s`/`e` or `start`/`duration`.
    Objects,
    /// Nothing recognizable.
    Unknown,
}

/// Key pairs tried in order on object records. The bool marks pairs whose
/// second field is a duration rather than an end time.
const OBJECT_KEY_PAIRS: &[(&str, &str, bool)] = &[
    ("start", "end", false),
    ("s", "e", false),
    ("start", "duration", true),
];

/// Decide the encoding of a timeline container.
pub fn detect_shape(timeline: &Value) -> TimelineShape {
    let Some(records) = timeline.as_array() else {
        return TimelineShape::Unknown;
    };
    for record in records {
        match record {
            Value::Array(fields) if fields.len() >= 3 => return TimelineShape::Tuples,
            Value::Array(_) => return TimelineShape::Unknown,
            Value::Object(_) => return TimelineShape::Objects,
            _ => continue,
        }
    }
    TimelineShape::Unknown
}

/// Convert a timeline payload into canonical intervals.
///
/// Idle intervals and unreadable records are dropped; input order is kept.
pub fn normalize_timeline(timeline: &Value) -> Vec<Interval> {
    let shape = detect_shape(timeline);
    let records = match (shape, timeline.as_array()) {
        (TimelineShape::Unknown, _) | (_, None) => return Vec::new(),
        (_, Some(records)) => records,
    };

    let mut intervals = Vec::with_capacity(records.len());
    let mut dropped = 0usize;
    let mut idle = 0usize;

    for record in records {
        let parsed = match (shape, record) {
            (TimelineShape::Tuples, Value::Array(fields)) => parse_tuple(fields),
            (TimelineShape::Objects, Value::Object(obj)) => parse_object(obj),
            _ => None,
        };
        match parsed {
            Some(iv) if iv.pid.is_idle() => idle += 1,
            Some(iv) => intervals.push(iv),
            None => dropped += 1,
        }
    }

    if dropped > 0 || idle > 0 {
        debug!(
            ?shape,
            kept = intervals.len(),
            dropped,
            idle,
            "normalized timeline"
        );
    }
    intervals
}

fn parse_tuple(fields: &[Value]) -> Option<Interval> {
    if fields.len() < 3 {
        return None;
    }
    let start = finite(&fields[1])?;
    let third = finite(&fields[2])?;
    let end = if third <= start { start + third } else { third };
    build(&fields[0], start, end)
}

fn parse_object(obj: &Map<String, Value>) -> Option<Interval> {
    // First pair whose two fields both read as numbers; a null `end` still
    // leaves `start`/`duration` usable.
    let (start, end) = OBJECT_KEY_PAIRS.iter().find_map(|&(a, b, is_duration)| {
        let start = finite(obj.get(a)?)?;
        let second = finite(obj.get(b)?)?;
        Some((start, if is_duration { start + second } else { second }))
    })?;
    build(obj.get("pid").unwrap_or(&Value::Null), start, end)
}

fn build(pid: &Value, start: f64, end: f64) -> Option<Interval> {
    if !end.is_finite() || end <= start {
        return None;
    }
    // A missing pid is the idle slot; keep it so the caller counts it as idle.
    let pid = Pid::from_value(pid).unwrap_or_else(|| Pid(String::new()));
    Some(Interval { pid, start, end })
}

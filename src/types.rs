//! Newtype wrappers and type aliases for domain concepts.
//!
//! Pids arrive as strings, integers or floats depending on which producer
//! wrote the payload; the `Pid` newtype pins them to one string form so
//! comparisons never mix representations. Times stay plain `f64` aliases
//! because payloads carry fractional timestamps.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::idle;

/// Continuous simulated time, in payload units.
pub type Time = f64;

/// Index of an integer time bucket `[t, t + 1)`.
pub type Bucket = u64;

/// Process identifier in canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(pub String);

impl Pid {
    /// Coerce a JSON scalar into a pid string.
    ///
    /// Integral floats print without a fraction (`1.0` becomes `"1"`).
    /// `null`, arrays and objects have no string form and yield `None`.
    pub fn from_value(value: &Value) -> Option<Pid> {
        match value {
            Value::String(s) => Some(Pid(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Pid(i.to_string()))
                } else if let Some(u) = n.as_u64() {
                    Some(Pid(u.to_string()))
                } else {
                    n.as_f64().map(|f| Pid(fmt_number(f)))
                }
            }
            Value::Bool(b) => Some(Pid(b.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_idle(&self) -> bool {
        idle::is_idle_str(&self.0)
    }
}

impl From<&str> for Pid {
    fn from(s: &str) -> Self {
        Pid(s.to_string())
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn fmt_number(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{f}")
    }
}

/// A half-open span `[start, end)` during which `pid` held the CPU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub pid: Pid,
    pub start: Time,
    pub end: Time,
}

impl Interval {
    pub fn new(pid: impl Into<Pid>, start: Time, end: Time) -> Self {
        Self {
            pid: pid.into(),
            start,
            end,
        }
    }

    pub fn duration(&self) -> Time {
        self.end - self.start
    }

    /// Buckets touched by this interval, clamped to `[0, len)`.
    ///
    /// Covers `floor(start) .. ceil(end)`, so `[2.4, 5.1)` touches 2..6.
    pub fn buckets(&self, len: usize) -> std::ops::Range<usize> {
        let first = self.start.max(0.0).floor();
        let last = self.end.min(len as f64).ceil();
        if !(last > first) {
            return 0..0;
        }
        (first as usize)..(last as usize).min(len)
    }
}

/// Kind of a raw trace record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Running,
    Stopped,
    #[serde(untagged)]
    Other(String),
}

impl EventKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "running" => EventKind::Running,
            "stopped" => EventKind::Stopped,
            other => EventKind::Other(other.to_string()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, EventKind::Running)
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Running => "running",
            EventKind::Stopped => "stopped",
            EventKind::Other(s) => s,
        }
    }
}

/// One state transition from a raw scheduler trace.
///
/// `pid` is `None` when the record carried no usable pid; such events
/// behave exactly like idle-pid events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub time: Time,
    #[serde(rename = "event")]
    pub kind: EventKind,
    pub pid: Option<Pid>,
}

impl Event {
    pub fn running(time: Time, pid: impl Into<Pid>) -> Self {
        Self {
            time,
            kind: EventKind::Running,
            pid: Some(pid.into()),
        }
    }

    pub fn stopped(time: Time, pid: impl Into<Pid>) -> Self {
        Self {
            time,
            kind: EventKind::Stopped,
            pid: Some(pid.into()),
        }
    }
}

/// A declared utilization sample. `cpu == None` means "not measured".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub time: Time,
    pub cpu: Option<f64>,
}

/// One bucket of an occupancy series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OccupancyPoint {
    pub time: Bucket,
    pub cpu: Option<f64>,
}

/// Busy value of an occupied bucket.
pub const BUSY: f64 = 100.0;
/// Busy value of an unoccupied bucket.
pub const IDLE: f64 = 0.0;

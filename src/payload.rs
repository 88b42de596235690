//! Parser for simulation result payloads.
//!
//! A simulation service returns one result object per run. Depending on the
//! producer it carries declared utilization samples (`cpu_series`), an
//! interval timeline (`memory_timeline` or `timeline`), a raw event log
//! (`trace`), or any mix of them, plus display-only metrics that pass
//! through untouched.
//!
//! Results arrive bare, paired in a compare bundle
//! (`{baseline, memory_aware}`), or wrapped in a saved-run envelope
//! (`{id, name, input, results, created_at}`). [`parse_document`] accepts
//! all three.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::series::parse_samples;
use crate::timeline::normalize_timeline;
use crate::trace::parse_events;
use crate::types::{Event, Interval, Pid, SamplePoint, Time};
use crate::value;

/// Metrics consumed only for display; kept verbatim.
pub const PASSTHROUGH_KEYS: &[&str] = &[
    "cpu_utilization",
    "context_switches",
    "waiting_times",
    "turnaround_times",
    "memory_estimates",
    "inferred_quanta",
    "meta",
];

/// Errors from reading payload documents.
///
/// Only the byte-to-JSON edge can fail. Once a document is a JSON object,
/// every field inside it is read leniently.
#[derive(Debug)]
pub enum PayloadError {
    /// JSON parse error.
    Json(serde_json::Error),
    /// Payload file could not be read.
    Io(std::io::Error),
    /// A value that must be an object was something else.
    NotAnObject(&'static str),
}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadError::Json(e) => write!(f, "JSON parse error: {e}"),
            PayloadError::Io(e) => write!(f, "I/O error: {e}"),
            PayloadError::NotAnObject(what) => write!(f, "{what} is not a JSON object"),
        }
    }
}

impl std::error::Error for PayloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PayloadError::Json(e) => Some(e),
            PayloadError::Io(e) => Some(e),
            PayloadError::NotAnObject(_) => None,
        }
    }
}

impl From<serde_json::Error> for PayloadError {
    fn from(e: serde_json::Error) -> Self {
        PayloadError::Json(e)
    }
}

impl From<std::io::Error> for PayloadError {
    fn from(e: std::io::Error) -> Self {
        PayloadError::Io(e)
    }
}

/// One run's result payload with every source parsed leniently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunPayload {
    /// Declared run length, when present, finite and positive.
    pub total_time: Option<Time>,
    /// Declared utilization samples from `cpu_series`.
    pub samples: Vec<SamplePoint>,
    /// Canonical intervals from `memory_timeline`, else `timeline`.
    pub timeline: Vec<Interval>,
    /// Raw events from `trace`.
    pub trace: Vec<Event>,
    /// Display-only fields, see [`PASSTHROUGH_KEYS`].
    pub passthrough: Map<String, Value>,
}

impl RunPayload {
    /// Read a result object. Non-object values yield an empty payload.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let timeline = ["memory_timeline", "timeline"]
            .iter()
            .filter_map(|k| obj.get(*k))
            .map(normalize_timeline)
            .find(|ivs| !ivs.is_empty())
            .unwrap_or_default();

        let passthrough = PASSTHROUGH_KEYS
            .iter()
            .filter_map(|k| obj.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect();

        Self {
            total_time: value::total_time(obj.get("total_time")),
            samples: obj.get("cpu_series").map(parse_samples).unwrap_or_default(),
            timeline,
            trace: obj.get("trace").map(parse_events).unwrap_or_default(),
            passthrough,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(PayloadError::NotAnObject("run payload"));
        }
        Ok(Self::from_value(&value))
    }

    /// A pass-through metric map (`waiting_times`, ...) as numbers.
    ///
    /// Entries whose value is not a finite number are skipped.
    pub fn metric_map(&self, key: &str) -> Vec<(String, f64)> {
        self.passthrough
            .get(key)
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| value::finite(v).map(|f| (k.clone(), f)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A pass-through scalar metric (`cpu_utilization`, ...).
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.passthrough.get(key).and_then(value::finite)
    }
}

/// Baseline and memory-aware results of the same configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompareBundle {
    pub baseline: RunPayload,
    pub memory_aware: RunPayload,
}

impl CompareBundle {
    pub fn from_value(value: &Value) -> Self {
        Self {
            baseline: value
                .get("baseline")
                .map(RunPayload::from_value)
                .unwrap_or_default(),
            memory_aware: value
                .get("memory_aware")
                .map(RunPayload::from_value)
                .unwrap_or_default(),
        }
    }

    fn looks_like(obj: &Map<String, Value>) -> bool {
        obj.contains_key("baseline") || obj.contains_key("memory_aware")
    }
}

/// Results held by a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Results {
    Single(RunPayload),
    Compare(CompareBundle),
}

/// A parsed payload document with its identity and declared processes.
#[derive(Debug, Clone, PartialEq)]
pub struct RunDocument {
    /// Saved-run id, when the document was an envelope that carried one.
    pub id: Option<String>,
    pub name: Option<String>,
    pub created_at: Option<String>,
    /// Declared pid order from `input.processes`.
    pub processes: Vec<Pid>,
    pub results: Results,
}

/// Parse a bare result, a compare bundle, or a saved-run envelope.
pub fn parse_document(value: &Value) -> Result<RunDocument, PayloadError> {
    let root = value
        .as_object()
        .ok_or(PayloadError::NotAnObject("document root"))?;

    let (body, envelope) = match root.get("results") {
        Some(results) => (
            results
                .as_object()
                .ok_or(PayloadError::NotAnObject("results"))?,
            true,
        ),
        None => (root, false),
    };

    let results = if CompareBundle::looks_like(body) {
        Results::Compare(CompareBundle::from_value(&Value::Object(body.clone())))
    } else {
        Results::Single(RunPayload::from_value(&Value::Object(body.clone())))
    };

    let text = |key: &str| {
        root.get(key).and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    };

    let processes = root
        .get("input")
        .map(declared_processes)
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| root.get("processes").map(parse_processes).unwrap_or_default());

    debug!(
        envelope,
        compare = matches!(results, Results::Compare(_)),
        processes = processes.len(),
        "parsed payload document"
    );

    Ok(RunDocument {
        id: text("id"),
        name: text("name"),
        created_at: text("created_at"),
        processes,
        results,
    })
}

pub fn parse_document_str(json: &str) -> Result<RunDocument, PayloadError> {
    let value: Value = serde_json::from_str(json)?;
    parse_document(&value)
}

pub fn load_document(path: &Path) -> Result<RunDocument, PayloadError> {
    let json = std::fs::read_to_string(path)?;
    parse_document_str(&json)
}

/// Process list of a simulation input: `processes`, `system.processes`, or
/// `processes_list`, first non-empty wins.
pub fn declared_processes(input: &Value) -> Vec<Pid> {
    let candidates = [
        input.get("processes"),
        input.get("system").and_then(|s| s.get("processes")),
        input.get("processes_list"),
    ];
    candidates
        .into_iter()
        .flatten()
        .map(parse_processes)
        .find(|p| !p.is_empty())
        .unwrap_or_default()
}

/// Read `Array<string | {pid}>` into pids. Unusable entries are skipped.
pub fn parse_processes(list: &Value) -> Vec<Pid> {
    let Some(entries) = list.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(obj) => obj.get("pid").and_then(Pid::from_value),
            other => Pid::from_value(other),
        })
        .collect()
}

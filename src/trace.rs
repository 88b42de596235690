//! Raw scheduler trace handling.
//!
//! A trace is a chronological log of `running`/`stopped` transitions. Only
//! `running` begins an active interval; any other event, or the end of the
//! stream, closes it. [`reconstruct_intervals`] turns a trace into canonical
//! intervals and [`synthesize_trace`] goes the other way.

use std::cmp::Ordering;

use serde_json::Value;
use tracing::debug;

use crate::types::{Event, EventKind, Interval, Pid, Time};
use crate::value::finite;

/// Parse trace records from a JSON payload.
///
/// Records without a finite `time` are dropped. A missing `event` is read
/// as an empty (non-running) event; a missing or unusable pid is `None`.
pub fn parse_events(trace: &Value) -> Vec<Event> {
    let Some(records) = trace.as_array() else {
        return Vec::new();
    };

    let mut events = Vec::with_capacity(records.len());
    for record in records {
        let Some(obj) = record.as_object() else {
            continue;
        };
        let Some(time) = obj.get("time").and_then(finite) else {
            continue;
        };
        let kind = obj
            .get("event")
            .and_then(Value::as_str)
            .map(EventKind::parse)
            .unwrap_or_else(|| EventKind::Other(String::new()));
        let pid = obj.get("pid").and_then(Pid::from_value);
        events.push(Event { time, kind, pid });
    }

    if events.len() < records.len() {
        debug!(
            kept = events.len(),
            dropped = records.len() - events.len(),
            "parsed trace"
        );
    }
    events
}

/// Sort events by time; at equal timestamps non-running events go first so
/// a slice closes before the next one opens. The sort is stable.
fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| {
        a.time
            .partial_cmp(&b.time)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.kind.is_running().cmp(&b.kind.is_running()))
    });
}

/// Rebuild canonical intervals from a trace.
///
/// An interval left open at the end of the stream is closed at
/// `last_time + 1`, or at `total_time` when that is later. Idle intervals
/// and zero-length intervals are not returned.
pub fn reconstruct_intervals(events: &[Event], total_time: Option<Time>) -> Vec<Interval> {
    let mut sorted: Vec<Event> = events
        .iter()
        .filter(|e| e.time.is_finite())
        .cloned()
        .collect();
    sort_events(&mut sorted);

    let mut intervals = Vec::new();
    let mut current: Option<(Option<Pid>, Time)> = None;
    let mut last_time: Option<Time> = None;

    let close = |pid: Option<Pid>, start: Time, end: Time, out: &mut Vec<Interval>| {
        if let Some(pid) = pid {
            if end > start && !pid.is_idle() {
                out.push(Interval { pid, start, end });
            }
        }
    };

    for event in &sorted {
        last_time = Some(event.time);
        match &event.kind {
            EventKind::Running => match current.take() {
                None => current = Some((event.pid.clone(), event.time)),
                Some((pid, start)) if pid == event.pid => current = Some((pid, start)),
                Some((pid, start)) => {
                    close(pid, start, event.time, &mut intervals);
                    current = Some((event.pid.clone(), event.time));
                }
            },
            _ => {
                if let Some((pid, start)) = current.take() {
                    close(pid, start, event.time, &mut intervals);
                }
            }
        }
    }

    if let (Some((pid, start)), Some(last)) = (current.take(), last_time) {
        let mut end = last + 1.0;
        if let Some(total) = total_time.filter(|t| t.is_finite()) {
            end = end.max(total);
        }
        close(pid, start, end, &mut intervals);
    }

    intervals
}

/// Emit a `running`/`stopped` pair per interval.
///
/// At equal timestamps `stopped` precedes `running`, then pids order
/// lexically, so feeding the result back through
/// [`reconstruct_intervals`] yields the same intervals.
pub fn synthesize_trace(intervals: &[Interval]) -> Vec<Event> {
    let mut events: Vec<Event> = intervals
        .iter()
        .filter(|iv| iv.end > iv.start)
        .flat_map(|iv| {
            [
                Event::running(iv.start, iv.pid.clone()),
                Event::stopped(iv.end, iv.pid.clone()),
            ]
        })
        .collect();

    events.sort_by(|a, b| {
        a.time
            .partial_cmp(&b.time)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.kind.is_running().cmp(&b.kind.is_running()))
            .then_with(|| a.pid.cmp(&b.pid))
    });
    events
}

use scx_occupancy::*;
use serde_json::json;

mod common;

/// Normalizing the same payload twice gives equal output.
#[test]
fn test_idempotent_normalization() {
    common::setup_test();
    let payload = json!({
        "total_time": 9,
        "cpu_series": [0.1, 0.4, null, 0.9],
        "memory_timeline": [["P1", 0, 3], {"pid": "P2", "s": 3, "e": 5}],
        "trace": [
            {"time": 0, "event": "running", "pid": "P1"},
            {"time": 3, "event": "stopped", "pid": "P1"},
        ],
    });
    let cfg = OccupancyConfig::default();
    let first = RunOccupancy::build(&RunPayload::from_value(&payload), &[], &cfg);
    let second = RunOccupancy::build(&RunPayload::from_value(&payload), &[], &cfg);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

/// No idle token ever reaches canonical intervals, whichever path produced
/// them.
#[test]
fn test_idle_exclusion_everywhere() {
    common::setup_test();
    let idle_pids = ["", "idle", "Idle", "IDLE", "0", "-1", "null", "NULL", " idle "];

    let tuples: Vec<_> = idle_pids
        .iter()
        .enumerate()
        .map(|(i, pid)| json!([pid, i, i + 1]))
        .collect();
    let objects: Vec<_> = idle_pids
        .iter()
        .enumerate()
        .map(|(i, pid)| json!({"pid": pid, "start": i, "end": i + 1}))
        .collect();
    let trace: Vec<_> = idle_pids
        .iter()
        .enumerate()
        .map(|(i, pid)| json!({"time": i, "event": "running", "pid": pid}))
        .collect();

    let from_tuples = normalize_timeline(&json!(tuples));
    let from_objects = normalize_timeline(&json!(objects));
    let from_trace = reconstruct_intervals(&parse_events(&json!(trace)), None);

    for ivs in [&from_tuples, &from_objects, &from_trace] {
        assert!(ivs.is_empty(), "idle intervals leaked: {ivs:?}");
    }

    let numeric = normalize_timeline(&json!([[0, 0, 2], [-1, 2, 4], [5, 4, 6]]));
    assert_eq!(numeric, vec![Interval::new("5", 4.0, 6.0)]);
}

#[test]
fn test_duration_inference() {
    let ivs = normalize_timeline(&json!([["P", 5, 3]]));
    assert_eq!(ivs, vec![Interval::new("P", 5.0, 8.0)]);
}

#[test]
fn test_bucket_rasterization() {
    let series = OccupancySeries::from_intervals(&[Interval::new("P", 2.4, 5.1)], Some(6.0));
    assert_eq!(common::busy_buckets(&series), vec![2, 3, 4, 5]);
    assert_eq!(series.len(), 6);
}

#[test]
fn test_scale_detection() {
    let cfg = OccupancyConfig::default();
    let fractions = OccupancySeries::from_samples(
        &parse_samples(&json!([[0, 0.2], [1, 0.5], [2, 0.9]])),
        None,
        &cfg,
    );
    assert_eq!(
        common::cpus(&fractions),
        vec![Some(20.0), Some(50.0), Some(90.0)]
    );

    let percents = OccupancySeries::from_samples(
        &parse_samples(&json!([{"t": 0, "y": 20}, {"t": 1, "y": 50}, {"t": 2, "y": 90}])),
        None,
        &cfg,
    );
    assert_eq!(
        common::cpus(&percents),
        vec![Some(20.0), Some(50.0), Some(90.0)]
    );
}

/// Flat zeros next to a real trace are replaced by the trace.
#[test]
fn test_degeneracy_fallback() {
    common::setup_test();
    let run = RunPayload::from_value(&json!({
        "cpu_series": [0, 0, 0, 0],
        "trace": [
            {"time": 0, "event": "running", "pid": "P1"},
            {"time": 1, "event": "stopped", "pid": "P1"},
            {"time": 2, "event": "running", "pid": "P2"},
            {"time": 4, "event": "stopped", "pid": "P2"},
        ],
    }));
    let occ = RunOccupancy::build(&run, &[], &OccupancyConfig::default());
    assert_eq!(occ.source, SourceKind::RawTrace);
    assert_eq!(common::busy_buckets(&occ.series), vec![0, 2, 3]);
    assert!(occ
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::DegenerateSamples { replaced_by_trace: true, .. })));
}

#[test]
fn test_alignment_union() {
    let a = OccupancySeries::new(
        (0..3)
            .map(|t| OccupancyPoint { time: t, cpu: Some(100.0) })
            .collect(),
    );
    let b = OccupancySeries::new(
        (1..4)
            .map(|t| OccupancyPoint { time: t, cpu: Some(0.0) })
            .collect(),
    );
    let aligned = align_series(&a, &b);
    let times: Vec<u64> = aligned.points.iter().map(|p| p.time).collect();
    assert_eq!(times, vec![0, 1, 2, 3]);
    assert_eq!(aligned.points[0].b, None);
    assert_eq!(aligned.points[0].a, Some(100.0));
    assert_eq!(aligned.points[3].a, None);
    assert_eq!(aligned.points[3].b, Some(0.0));
}

#[test]
fn test_per_pid_growth() {
    let ivs = normalize_timeline(&json!([["P1", 0, 2], ["P9", 4, 6]]));
    let matrix = PerPidMatrix::build(&ivs, None, &[Pid::from("P1"), Pid::from("P2")]);
    assert_eq!(
        matrix.pids(),
        &[Pid::from("P1"), Pid::from("P2"), Pid::from("P9")]
    );
    assert_eq!(common::column(&matrix, "P9"), vec![0, 0, 0, 0, 100, 100]);
    assert_eq!(common::column(&matrix, "P2"), vec![0; 6]);
}

/// A stop and a start at the same instant hand the CPU over without overlap
/// and without a gap.
#[test]
fn test_trace_tie_break() {
    let events = parse_events(&json!([
        {"time": 0, "event": "running", "pid": "A"},
        {"time": 5, "event": "running", "pid": "B"},
        {"time": 5, "event": "stopped", "pid": "A"},
        {"time": 8, "event": "stopped", "pid": "B"},
    ]));
    let ivs = reconstruct_intervals(&events, None);
    assert_eq!(
        ivs,
        vec![Interval::new("A", 0.0, 5.0), Interval::new("B", 5.0, 8.0)]
    );
    let series = OccupancySeries::from_intervals(&ivs, None);
    assert_eq!(series.len(), 8);
    assert_eq!(series.busy_count(), 8);
}

/// Every malformed shape yields a typed, empty result rather than an error.
#[test]
fn test_malformed_payloads_are_total() {
    common::setup_test();
    let cfg = OccupancyConfig::default();
    for payload in [
        json!(null),
        json!("run"),
        json!({"cpu_series": "abc", "timeline": 5, "trace": {"time": 1}}),
        json!({"cpu_series": [[null, 5]], "timeline": [[1, 2]], "trace": [null]}),
        json!({"total_time": "soon", "timeline": [{"pid": "P1", "start": "x", "end": 2}]}),
    ] {
        let run = RunPayload::from_value(&payload);
        let occ = RunOccupancy::build(&run, &[], &cfg);
        assert_eq!(occ.source, SourceKind::Empty, "payload {payload}");
        assert!(occ.series.is_empty());
        assert!(occ.per_pid.is_empty());
    }
}

#![allow(dead_code)]

use scx_occupancy::{OccupancySeries, PerPidMatrix, Pid};

/// Initialize tracing from `RUST_LOG`.
///
/// `try_init()` is idempotent: first call in the process succeeds,
/// subsequent calls are silently ignored.
pub fn setup_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Measured values of a series in bucket order.
pub fn cpus(series: &OccupancySeries) -> Vec<Option<f64>> {
    series.points().iter().map(|p| p.cpu).collect()
}

/// Buckets of a series that are fully busy.
pub fn busy_buckets(series: &OccupancySeries) -> Vec<u64> {
    series
        .points()
        .iter()
        .filter(|p| p.cpu == Some(100.0))
        .map(|p| p.time)
        .collect()
}

pub fn column(matrix: &PerPidMatrix, pid: &str) -> Vec<u8> {
    matrix
        .column(&Pid::from(pid))
        .unwrap_or_else(|| panic!("pid {pid} missing from {:?}", matrix.pids()))
        .to_vec()
}

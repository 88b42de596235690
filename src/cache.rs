//! Memoized pipeline outputs.
//!
//! Builders are pure, so an output only depends on the run it came from and
//! the total time it was built against. [`OccupancyCache`] keys on exactly
//! that pair and hands back the stored `Arc` on a hit, so repeated lookups
//! return the same value without re-deriving it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::config::OccupancyConfig;
use crate::payload::RunPayload;
use crate::run::RunOccupancy;
use crate::types::{Pid, Time};

/// Identity of a cached output: the run and the total time it was built
/// against. Total times compare bitwise so `NaN` keys stay usable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunKey {
    pub run_id: String,
    total_time_bits: Option<u64>,
}

impl RunKey {
    pub fn new(run_id: impl Into<String>, total_time: Option<Time>) -> Self {
        Self {
            run_id: run_id.into(),
            total_time_bits: total_time.map(f64::to_bits),
        }
    }

    pub fn total_time(&self) -> Option<Time> {
        self.total_time_bits.map(f64::from_bits)
    }
}

/// Thread-safe memo of [`RunOccupancy`] values.
///
/// Callers own the meaning of `run_id`: a saved-run id plus the side
/// (`"12/baseline"`), a content hash, or anything else that changes when
/// the payload changes. The cache never inspects payloads to detect that.
#[derive(Debug)]
pub struct OccupancyCache {
    cfg: OccupancyConfig,
    entries: Mutex<HashMap<RunKey, Arc<RunOccupancy>>>,
}

impl OccupancyCache {
    pub fn new(cfg: OccupancyConfig) -> Self {
        Self {
            cfg,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &OccupancyConfig {
        &self.cfg
    }

    /// Return the memoized output for `(run_id, run.total_time)`, building
    /// it on first use.
    ///
    /// The lock is not held while building, so two threads racing on the
    /// same key may both build; the first insert wins and both callers get
    /// that value.
    pub fn get_or_build(
        &self,
        run_id: &str,
        run: &RunPayload,
        processes: &[Pid],
    ) -> Arc<RunOccupancy> {
        let key = RunKey::new(run_id, run.total_time);
        if let Some(hit) = self.lock().get(&key) {
            return Arc::clone(hit);
        }

        let built = Arc::new(RunOccupancy::build(run, processes, &self.cfg));
        debug!(run_id, "memoized run occupancy");
        Arc::clone(self.lock().entry(key).or_insert(built))
    }

    pub fn get(&self, key: &RunKey) -> Option<Arc<RunOccupancy>> {
        self.lock().get(key).cloned()
    }

    /// Drop every entry for `run_id`, whatever its total time.
    pub fn invalidate(&self, run_id: &str) {
        self.lock().retain(|k, _| k.run_id != run_id);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RunKey, Arc<RunOccupancy>>> {
        // Entries are immutable once inserted, so a poisoned map is still
        // consistent.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for OccupancyCache {
    fn default() -> Self {
        Self::new(OccupancyConfig::default())
    }
}

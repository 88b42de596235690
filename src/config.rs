//! Normalization tunables.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Upper bound of the range in which declared samples are read as fractions.
pub const DEFAULT_FRACTION_CEILING: f64 = 1.01;

/// Tunables shared by every builder in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OccupancyConfig {
    /// Declared samples whose maximum lies in `(0, fraction_ceiling]` are
    /// fractions and get scaled by 100.
    pub fraction_ceiling: f64,
    /// Rebuild degenerate declared series from the run's trace when one is
    /// available.
    pub trace_fallback: bool,
}

impl Default for OccupancyConfig {
    fn default() -> Self {
        Self {
            fraction_ceiling: DEFAULT_FRACTION_CEILING,
            trace_fallback: true,
        }
    }
}

impl OccupancyConfig {
    /// Defaults overridden by `SCX_OCC_FRACTION_CEILING` and
    /// `SCX_OCC_TRACE_FALLBACK`.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var("SCX_OCC_FRACTION_CEILING").ok().as_deref(),
            std::env::var("SCX_OCC_TRACE_FALLBACK").ok().as_deref(),
        )
    }

    fn from_vars(fraction_ceiling: Option<&str>, trace_fallback: Option<&str>) -> Self {
        let mut cfg = Self::default();
        if let Some(s) = fraction_ceiling.filter(|s| !s.is_empty()) {
            match parse_fraction_ceiling(s) {
                Ok(v) => cfg.fraction_ceiling = v,
                Err(e) => warn!("SCX_OCC_FRACTION_CEILING: {e}, using default"),
            }
        }
        if let Some(s) = trace_fallback.filter(|s| !s.is_empty()) {
            match parse_bool(s) {
                Some(v) => cfg.trace_fallback = v,
                None => warn!("SCX_OCC_TRACE_FALLBACK={s:?}: expected a boolean, using default"),
            }
        }
        cfg
    }
}

/// Parse a fraction ceiling: a finite number greater than zero.
pub fn parse_fraction_ceiling(s: &str) -> Result<f64, String> {
    let v: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("{s:?} is not a number"))?;
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(format!("{s:?} must be a finite number greater than zero"))
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

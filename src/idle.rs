//! Idle-slot classification.
//!
//! Simulation producers mark "nobody on the CPU" in several ways: a missing
//! pid, an empty string, or one of a few sentinel tokens. Every consumer of a
//! pid goes through [`is_idle`] or [`is_idle_str`] so the rule is applied
//! identically across timelines, traces and per-pid matrices.

use serde_json::Value;

/// Tokens that denote the idle slot after trimming and lower-casing.
pub const IDLE_TOKENS: &[&str] = &["", "idle", "0", "-1", "null"];

/// Whether a raw JSON pid value denotes the idle slot.
///
/// `null` is idle. Scalars are coerced to their string form first, so the
/// number `0` and the string `" 0 "` are both idle. Arrays and objects have
/// no pid form and count as idle.
pub fn is_idle(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(v) => match crate::types::Pid::from_value(v) {
            Some(pid) => is_idle_str(pid.as_str()),
            None => true,
        },
    }
}

/// Whether a pid string denotes the idle slot.
pub fn is_idle_str(pid: &str) -> bool {
    let token = pid.trim().to_lowercase();
    IDLE_TOKENS.contains(&token.as_str())
}

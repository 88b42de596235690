//! Lenient accessors over `serde_json::Value`.

use serde_json::{Map, Value};

/// Read a finite number from a JSON number or a numeric string.
pub(crate) fn finite(value: &Value) -> Option<f64> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    f.is_finite().then_some(f)
}

/// Read the first alias in `keys` whose value is a finite number.
///
/// Aliases holding `null` or garbage are skipped, so a later alias can
/// still supply the field.
pub(crate) fn first_finite(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| obj.get(*k).and_then(finite))
}

/// Read an optional total time: present, finite and positive.
pub(crate) fn total_time(value: Option<&Value>) -> Option<f64> {
    value.and_then(finite).filter(|t| *t > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_finite() {
        assert_eq!(finite(&json!(3)), Some(3.0));
        assert_eq!(finite(&json!(2.5)), Some(2.5));
        assert_eq!(finite(&json!(" 4 ")), Some(4.0));
        assert_eq!(finite(&json!("")), None);
        assert_eq!(finite(&json!("NaN")), None);
        assert_eq!(finite(&json!("inf")), None);
        assert_eq!(finite(&json!(null)), None);
        assert_eq!(finite(&json!(true)), None);
    }

    #[test]
    fn test_first_finite_skips_unusable_aliases() {
        let obj = json!({"cpu": null, "value": "x", "y": 50});
        let obj = obj.as_object().unwrap();
        assert_eq!(first_finite(obj, &["cpu", "value", "y", "v"]), Some(50.0));
        assert_eq!(first_finite(obj, &["cpu", "value"]), None);
        assert_eq!(first_finite(obj, &["missing"]), None);
    }

    #[test]
    fn test_total_time() {
        assert_eq!(total_time(Some(&json!(12))), Some(12.0));
        assert_eq!(total_time(Some(&json!(0))), None);
        assert_eq!(total_time(Some(&json!(-4))), None);
        assert_eq!(total_time(None), None);
    }
}

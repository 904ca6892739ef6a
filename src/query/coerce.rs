use serde_json::Value;

/// Best-effort conversion of a loosely typed scraped value to a float.
///
/// Numbers pass through unchanged. A non-empty array coerces its first
/// element only (multi-valued numeric fields are "first wins"). Strings are
/// parsed after stripping spaces and mapping the French decimal comma to a
/// period, so `"1 234,56"` becomes `1234.56`. Everything else — objects,
/// booleans, null, empty arrays, unparsable strings — is `None`.
pub fn coerce(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Array(items) => items.first().and_then(coerce),
        Value::String(s) => {
            let normalized: String = s
                .chars()
                .filter(|c| *c != ' ')
                .map(|c| if c == ',' { '.' } else { c })
                .collect();
            normalized.parse::<f64>().ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_pass_through() {
        assert_eq!(coerce(&json!(42)), Some(42.0));
        assert_eq!(coerce(&json!(-3.5)), Some(-3.5));
    }

    #[test]
    fn french_price_strings() {
        assert_eq!(coerce(&json!("1 234,56")), Some(1234.56));
        assert_eq!(coerce(&json!("15 000")), Some(15000.0));
        assert_eq!(coerce(&json!("8500.5")), Some(8500.5));
    }

    #[test]
    fn first_element_wins() {
        assert_eq!(coerce(&json!([15000, 1])), Some(15000.0));
        assert_eq!(coerce(&json!([["7 900", 2]])), Some(7900.0));
    }

    #[test]
    fn not_numeric() {
        assert_eq!(coerce(&json!("not a number")), None);
        assert_eq!(coerce(&json!(true)), None);
        assert_eq!(coerce(&json!(null)), None);
        assert_eq!(coerce(&json!({})), None);
        assert_eq!(coerce(&json!([])), None);
        assert_eq!(coerce(&json!(["n/a"])), None);
    }
}

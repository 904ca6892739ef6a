use serde_json::Value;

use super::search::search;

/// Site schema conventions for the semi-structured attribute blocks. The
/// marketplace controls this shape, not us; if it renames a field upstream
/// the fix is a one-line change here.
pub const ATTRIBUTES_FIELD: &str = "attributes";
pub const ATTR_KEY: &str = "key";
pub const ATTR_VALUE: &str = "value";

static NULL: Value = Value::Null;

/// Collect the `value` of every attribute entry whose `key` equals
/// `attribute_key`, from every `attributes` array at any depth, in document
/// order. An entry that matches but carries no `value` field contributes
/// null, so positions stay aligned with the entry list.
pub fn get_attribute<'a>(doc: &'a Value, attribute_key: &str) -> Vec<&'a Value> {
    search(doc, |key, value, out| {
        if key != ATTRIBUTES_FIELD {
            return;
        }
        let Some(entries) = value.as_array() else {
            return;
        };
        for entry in entries {
            if entry.get(ATTR_KEY).and_then(Value::as_str) == Some(attribute_key) {
                out.push(entry.get(ATTR_VALUE).unwrap_or(&NULL));
            }
        }
    })
}

/// Index-addressed form: out of range is `None`, never a panic.
pub fn get_attribute_at<'a>(
    doc: &'a Value,
    attribute_key: &str,
    index: usize,
) -> Option<&'a Value> {
    get_attribute(doc, attribute_key).get(index).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_attribute() {
        let doc = json!({"attributes": [{"key": "brand", "value": "Renault"}]});
        assert_eq!(get_attribute(&doc, "brand"), [&json!("Renault")]);
        assert_eq!(get_attribute_at(&doc, "brand", 0), Some(&json!("Renault")));
        assert_eq!(get_attribute_at(&doc, "brand", 1), None);
    }

    #[test]
    fn nested_blocks_are_all_found() {
        let doc = json!({
            "attributes": [{"key": "brand", "value": "Renault"}],
            "variants": [
                {"attributes": [{"key": "brand", "value": "Dacia"}]}
            ]
        });
        assert_eq!(
            get_attribute(&doc, "brand"),
            [&json!("Renault"), &json!("Dacia")]
        );
    }

    #[test]
    fn missing_key_is_empty() {
        let doc = json!({"attributes": [{"key": "model", "value": "Clio"}]});
        assert!(get_attribute(&doc, "brand").is_empty());
    }

    #[test]
    fn malformed_entries_are_skipped() {
        // Non-array attributes field, non-object entries: nothing matches,
        // nothing panics.
        let doc = json!({
            "attributes": "oops",
            "nested": {"attributes": ["stray", {"key": "brand", "value": "Peugeot"}]}
        });
        assert_eq!(get_attribute(&doc, "brand"), [&json!("Peugeot")]);
    }

    #[test]
    fn entry_without_value_contributes_null() {
        let doc = json!({"attributes": [{"key": "brand"}]});
        assert_eq!(get_attribute(&doc, "brand"), [&Value::Null]);
    }
}

use serde_json::Value;

use super::search::search;

/// Collect the value of every object field exactly named `element_name`, at
/// any depth, in document order. A field name appearing at several nesting
/// levels yields several entries; callers wanting a single canonical value
/// take position 0 by convention.
pub fn get_element<'a>(doc: &'a Value, element_name: &str) -> Vec<&'a Value> {
    search(doc, |key, value, out| {
        if key == element_name {
            out.push(value);
        }
    })
}

/// Index-addressed form: out of range is `None`, never a panic.
pub fn get_element_at<'a>(doc: &'a Value, element_name: &str, index: usize) -> Option<&'a Value> {
    get_element(doc, element_name).get(index).copied()
}

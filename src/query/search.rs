use serde_json::Value;

/// Pre-order depth-first walk over an untyped JSON document.
///
/// `select` fires once per object key/value pair, in insertion order, and
/// appends whatever it wants to keep to the output. Matching never prunes
/// descent: nested records may repeat field names at any depth and every
/// occurrence must be collected. Arrays recurse per element without being
/// tested; scalars terminate the walk.
pub fn search<'a, F>(root: &'a Value, mut select: F) -> Vec<&'a Value>
where
    F: FnMut(&str, &'a Value, &mut Vec<&'a Value>),
{
    let mut out = Vec::new();
    walk(root, &mut select, &mut out);
    out
}

fn walk<'a, F>(node: &'a Value, select: &mut F, out: &mut Vec<&'a Value>)
where
    F: FnMut(&str, &'a Value, &mut Vec<&'a Value>),
{
    match node {
        Value::Object(map) => {
            for (key, value) in map {
                select(key, value, out);
                walk(value, select, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, select, out);
            }
        }
        _ => {}
    }
}

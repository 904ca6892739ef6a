use std::collections::BTreeSet;

use serde_json::Value;

use crate::query::{attribute, coerce::coerce, element, search::search};

/// Canonical per-ad price: the first `price` element found anywhere in the
/// record, unwrapped through nested lists by first element, then coerced.
pub fn extract_price(ad: &Value) -> Option<f64> {
    let prices = element::get_element(ad, "price");
    let mut first = *prices.first()?;
    while let Some(items) = first.as_array() {
        first = items.first()?;
    }
    coerce(first)
}

/// Canonical per-ad location: the first `city` element, first entry when the
/// site returns a list of labels ("Lyon", "Lyon 2e").
pub fn extract_location(ad: &Value) -> Option<String> {
    let cities = element::get_element(ad, "city");
    let mut first = *cities.first()?;
    if let Some(items) = first.as_array() {
        first = items.first()?;
    }
    Some(stringify(first))
}

/// String form of a scraped value: strings unquoted, anything else as JSON.
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Keep ads whose price and location pass all the given criteria. A missing
/// price only disqualifies a record when a price bound was actually asked
/// for, same for location keywords.
pub fn filter_ads<'a>(
    ads: &'a [Value],
    min_price: Option<f64>,
    max_price: Option<f64>,
    city_keywords: &[String],
) -> Vec<&'a Value> {
    ads.iter()
        .filter(|ad| price_matches(ad, min_price, max_price))
        .filter(|ad| location_matches(ad, city_keywords))
        .collect()
}

fn price_matches(ad: &Value, min: Option<f64>, max: Option<f64>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(price) = extract_price(ad) else {
        return false;
    };
    min.is_none_or(|m| price >= m) && max.is_none_or(|m| price <= m)
}

fn location_matches(ad: &Value, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let Some(location) = extract_location(ad) else {
        return false;
    };
    let location = location.to_lowercase();
    keywords.iter().any(|kw| location.contains(&kw.to_lowercase()))
}

/// Every attribute `key` seen anywhere in the corpus, sorted.
pub fn attribute_keys(docs: &[Value]) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    for doc in docs {
        let hits = search(doc, |key, value, out| {
            if key != attribute::ATTRIBUTES_FIELD {
                return;
            }
            let Some(entries) = value.as_array() else {
                return;
            };
            for entry in entries {
                if let Some(k) = entry.get(attribute::ATTR_KEY) {
                    out.push(k);
                }
            }
        });
        keys.extend(hits.iter().filter_map(|v| v.as_str().map(str::to_owned)));
    }
    keys
}

/// Every object field name at any depth across the corpus, sorted.
pub fn element_names(docs: &[Value]) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for doc in docs {
        collect_names(doc, &mut names);
    }
    names
}

fn collect_names(node: &Value, names: &mut BTreeSet<String>) {
    match node {
        Value::Object(map) => {
            for (key, value) in map {
                names.insert(key.clone());
                collect_names(value, names);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_names(item, names);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture_ads() -> Vec<Value> {
        crate::corpus::load_documents(std::path::Path::new("tests/fixtures/corpus"))
    }

    #[test]
    fn price_unwraps_nested_lists() {
        let ad = json!({"price": [[15000], 9000]});
        assert_eq!(extract_price(&ad), Some(15000.0));
    }

    #[test]
    fn price_found_at_depth() {
        let ad = json!({"sale": {"price": "12 500,00"}});
        assert_eq!(extract_price(&ad), Some(12500.0));
    }

    #[test]
    fn price_absent_or_empty() {
        assert_eq!(extract_price(&json!({"subject": "no price"})), None);
        assert_eq!(extract_price(&json!({"price": []})), None);
        assert_eq!(extract_price(&json!({"price": "offre"})), None);
    }

    #[test]
    fn location_scalar_and_list() {
        let paris = json!({"location": {"city": "Paris"}});
        let lyon = json!({"city": ["Lyon", "Lyon 2e"]});
        assert_eq!(extract_location(&paris).as_deref(), Some("Paris"));
        assert_eq!(extract_location(&lyon).as_deref(), Some("Lyon"));
        assert_eq!(extract_location(&json!({"subject": "x"})), None);
    }

    #[test]
    fn filter_by_price_bounds() {
        let ads = fixture_ads();
        let kept = filter_ads(&ads, Some(10000.0), None, &[]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0]["list_id"], json!(2997258439i64));

        // A price bound drops the record whose price never coerces.
        let kept = filter_ads(&ads, None, Some(20000.0), &[]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn filter_by_city_keyword_is_case_insensitive() {
        let ads = fixture_ads();
        let kept = filter_ads(&ads, None, None, &["lyon".to_string()]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0]["list_id"], json!(2997258440i64));
    }

    #[test]
    fn no_criteria_keeps_everything() {
        let ads = fixture_ads();
        assert_eq!(filter_ads(&ads, None, None, &[]).len(), ads.len());
    }

    #[test]
    fn key_inventory() {
        let ads = fixture_ads();
        let attrs = attribute_keys(&ads);
        assert!(attrs.contains("brand"));
        assert!(attrs.contains("mileage"));
        let names = element_names(&ads);
        assert!(names.contains("price"));
        assert!(names.contains("store_id")); // nested under owner
    }
}

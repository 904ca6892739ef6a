pub mod attribute;
pub mod coerce;
pub mod element;
pub mod search;

use clap::ValueEnum;
use serde_json::Value;

/// Which index a corpus query runs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueryMode {
    /// The `attributes` key/value convention
    Attribute,
    /// Exact field name at any depth
    Element,
}

pub fn run_query<'a>(doc: &'a Value, mode: QueryMode, key: &str) -> Vec<&'a Value> {
    match mode {
        QueryMode::Attribute => attribute::get_attribute(doc, key),
        QueryMode::Element => element::get_element(doc, key),
    }
}

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use tracing::{info, warn};

use crate::query::{self, coerce::coerce, QueryMode};

pub const DEFAULT_DATA_DIR: &str = "data/ads";

static PAGE_FILE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ads_\d+\.json$").unwrap());

/// Page files in `dir`, in directory-listing order. A missing directory is
/// an empty corpus, not an error.
pub fn page_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| PAGE_FILE_RE.is_match(n))
        })
        .collect()
}

/// Parse every page file into a flat document list. An array root contributes
/// one document per element, an object root is a single document. A file that
/// cannot be read or parsed is skipped, never fatal to the rest of the corpus.
pub fn load_documents(dir: &Path) -> Vec<Value> {
    let mut docs = Vec::new();
    for path in page_files(dir) {
        match read_page(&path) {
            Ok(Value::Array(ads)) => docs.extend(ads),
            Ok(other) => docs.push(other),
            Err(e) => warn!("Skipping {}: {e:#}", path.display()),
        }
    }
    docs
}

fn read_page(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).context("read failed")?;
    serde_json::from_str(&text).context("parse failed")
}

/// Delete every page file in `dir` and return how many went away. A file
/// that fails to delete is logged and left behind, never fatal.
pub fn cleanup(dir: &Path) -> usize {
    let mut deleted = 0;
    for path in page_files(dir) {
        match fs::remove_file(&path) {
            Ok(()) => deleted += 1,
            Err(e) => warn!("Could not delete {}: {e}", path.display()),
        }
    }
    info!("Cleanup removed {deleted} page files from {}", dir.display());
    deleted
}

/// Coerced numeric series for `key` across the whole corpus. Per document
/// the selected index runs once; array-valued matches are expanded one level;
/// every entry then goes through coercion and non-numeric ones drop out.
pub fn aggregate(dir: &Path, key: &str, mode: QueryMode) -> Vec<f64> {
    load_documents(dir)
        .iter()
        .flat_map(|doc| document_series(doc, key, mode))
        .collect()
}

/// Series contribution of one document: run the selected index, expand
/// array-valued matches one level, keep whatever coerces.
fn document_series(doc: &Value, key: &str, mode: QueryMode) -> Vec<f64> {
    let mut series = Vec::new();
    for matched in query::run_query(doc, mode, key) {
        match matched {
            Value::Array(items) => series.extend(items.iter().filter_map(coerce)),
            other => series.extend(coerce(other)),
        }
    }
    series
}

pub fn get_max(dir: &Path, key: &str, mode: QueryMode) -> Option<f64> {
    aggregate(dir, key, mode).into_iter().reduce(f64::max)
}

pub fn get_min(dir: &Path, key: &str, mode: QueryMode) -> Option<f64> {
    aggregate(dir, key, mode).into_iter().reduce(f64::min)
}

pub fn get_mean(dir: &Path, key: &str, mode: QueryMode) -> Option<f64> {
    let series = aggregate(dir, key, mode);
    if series.is_empty() {
        None
    } else {
        Some(series.iter().sum::<f64>() / series.len() as f64)
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::ValueEnum;
use serde_json::Value;
use tracing::info;

use crate::ads::{extract_location, extract_price, stringify};
use crate::query::{attribute, element};

pub const DEFAULT_EXPORT_DIR: &str = "exports";

const CSV_HEADER: [&str; 7] = ["id", "title", "price", "city", "brand", "model", "url"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

/// Write the given ads to a timestamped file under `out_dir` and return its
/// path. JSON keeps the raw records; CSV flattens each ad through the query
/// layer, leaving absent fields as empty cells.
pub fn export(ads: &[&Value], format: ExportFormat, out_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let path = match format {
        ExportFormat::Json => export_json(ads, out_dir)?,
        ExportFormat::Csv => export_csv(ads, out_dir)?,
    };
    info!("Exported {} ads to {}", ads.len(), path.display());
    Ok(path)
}

fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn export_json(ads: &[&Value], out_dir: &Path) -> Result<PathBuf> {
    let path = out_dir.join(format!("export_{}.json", timestamp()));
    fs::write(&path, serde_json::to_string_pretty(ads)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

fn export_csv(ads: &[&Value], out_dir: &Path) -> Result<PathBuf> {
    let path = out_dir.join(format!("export_{}.csv", timestamp()));
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    writer.write_record(CSV_HEADER)?;
    for ad in ads {
        writer.write_record(csv_row(ad))?;
    }
    writer.flush()?;
    Ok(path)
}

fn csv_row(ad: &Value) -> [String; 7] {
    [
        element_field(ad, "list_id"),
        element_field(ad, "subject"),
        extract_price(ad).map(|p| p.to_string()).unwrap_or_default(),
        extract_location(ad).unwrap_or_default(),
        attribute_field(ad, "brand"),
        attribute_field(ad, "model"),
        element_field(ad, "url"),
    ]
}

fn element_field(ad: &Value, name: &str) -> String {
    element::get_element_at(ad, name, 0)
        .map(stringify)
        .unwrap_or_default()
}

fn attribute_field(ad: &Value, key: &str) -> String {
    attribute::get_attribute_at(ad, key, 0)
        .map(stringify)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn csv_row_flattens_through_the_query_layer() {
        let ad = json!({
            "list_id": 2997258439i64,
            "subject": "Renault Clio IV",
            "url": "https://www.example.org/ad/2997258439",
            "price": [15000],
            "location": {"city": "Paris"},
            "attributes": [
                {"key": "brand", "value": "Renault"},
                {"key": "model", "value": "Clio"}
            ]
        });
        assert_eq!(
            csv_row(&ad),
            [
                "2997258439",
                "Renault Clio IV",
                "15000",
                "Paris",
                "Renault",
                "Clio",
                "https://www.example.org/ad/2997258439"
            ]
        );
    }

    #[test]
    fn absent_fields_are_empty_cells() {
        let ad = json!({"subject": "mystery ad"});
        let row = csv_row(&ad);
        assert_eq!(row[1], "mystery ad");
        assert!(row[2].is_empty());
        assert!(row[4].is_empty());
    }

    #[test]
    fn json_export_round_trips() {
        let out_dir = std::env::temp_dir().join("ads_scraper_export_test");
        let ads = [json!({"list_id": 1, "price": 100})];
        let refs: Vec<&Value> = ads.iter().collect();
        let path = export(&refs, ExportFormat::Json, &out_dir).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["price"], json!(100));
        fs::remove_file(path).ok();
    }
}

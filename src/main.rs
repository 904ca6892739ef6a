mod ads;
mod corpus;
mod export;
mod fetch;
mod query;
mod stats;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::warn;

use export::ExportFormat;
use query::QueryMode;

#[derive(Parser)]
#[command(name = "ads_scraper", about = "Classified-ads scraper and corpus query tool")]
struct Cli {
    /// Directory holding the scraped ads_<n>.json page files
    #[arg(long, global = true, default_value = corpus::DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch search-result pages and store one ads_<n>.json per page
    Fetch {
        /// Search URL; its page= parameter is rewritten per page
        url: String,
        /// Number of pages to fetch
        #[arg(short = 'n', long, default_value = "1")]
        pages: usize,
    },
    /// Fetch a single ad page and print its description
    Description { url: String },
    /// Per-file extraction report for an attribute key or element name
    Extract {
        mode: QueryMode,
        key: String,
        /// Pick one entry of the result list instead of the whole list
        #[arg(long)]
        index: Option<usize>,
    },
    /// Maximum of the coerced values for a key across the corpus
    Max { mode: QueryMode, key: String },
    /// Minimum of the coerced values for a key across the corpus
    Min { mode: QueryMode, key: String },
    /// Mean of the coerced values for a key across the corpus
    Mean { mode: QueryMode, key: String },
    /// List every attribute key and element name seen in the corpus
    Keys,
    /// Price, brand and location statistics over the whole corpus
    Summary {
        /// Emit the summary as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Delete every ads_<n>.json page file in the data directory
    Cleanup {
        /// Only report how many page files exist, delete nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// List ads matching price bounds and/or city keywords
    Filter {
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        /// City keyword, case-insensitive substring; repeatable
        #[arg(long = "city")]
        cities: Vec<String>,
    },
    /// Export the (optionally filtered) corpus to a file
    Export {
        format: ExportFormat,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        #[arg(long = "city")]
        cities: Vec<String>,
        #[arg(long, default_value = export::DEFAULT_EXPORT_DIR)]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let dir = &cli.data_dir;

    match cli.command {
        Commands::Fetch { url, pages } => {
            let count = fetch::fetch_ads(&url, pages, dir).await?;
            if count > 0 {
                println!(
                    "Fetched {} ads over {} pages into {}",
                    count,
                    pages,
                    dir.display()
                );
            } else {
                println!("No ads found. Check the URL or try again later.");
            }
        }
        Commands::Description { url } => {
            let description = fetch::fetch_description(&url).await?;
            println!("{description}");
        }
        Commands::Extract { mode, key, index } => {
            let report = extraction_report(dir, mode, &key, index);
            if report.is_empty() {
                println!("No ads_<n>.json files in {}. Run 'fetch' first.", dir.display());
            } else {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Commands::Max { mode, key } => {
            print_aggregate("Max", corpus::get_max(dir, &key, mode), mode, &key);
        }
        Commands::Min { mode, key } => {
            print_aggregate("Min", corpus::get_min(dir, &key, mode), mode, &key);
        }
        Commands::Mean { mode, key } => {
            print_aggregate("Mean", corpus::get_mean(dir, &key, mode), mode, &key);
        }
        Commands::Keys => {
            let docs = corpus::load_documents(dir);
            println!("Attributes:");
            for key in ads::attribute_keys(&docs) {
                println!("  - {key}");
            }
            println!("\nElements:");
            for name in ads::element_names(&docs) {
                println!("  - {name}");
            }
        }
        Commands::Summary { json } => {
            let docs = corpus::load_documents(dir);
            let summary = stats::summary(&docs);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Commands::Cleanup { dry_run } => {
            let count = corpus::page_files(dir).len();
            if count == 0 {
                println!("No page files in {}.", dir.display());
            } else if dry_run {
                println!(
                    "{} page files in {}. Run without --dry-run to delete them.",
                    count,
                    dir.display()
                );
            } else {
                let deleted = corpus::cleanup(dir);
                println!("Deleted {deleted} of {count} page files.");
            }
        }
        Commands::Filter {
            min_price,
            max_price,
            cities,
        } => {
            let docs = corpus::load_documents(dir);
            let kept = ads::filter_ads(&docs, min_price, max_price, &cities);
            if kept.is_empty() {
                println!("No ads match the given criteria.");
            } else {
                print_ads_table(&kept);
            }
        }
        Commands::Export {
            format,
            min_price,
            max_price,
            cities,
            out_dir,
        } => {
            let docs = corpus::load_documents(dir);
            let kept = ads::filter_ads(&docs, min_price, max_price, &cities);
            let path = export::export(&kept, format, &out_dir)?;
            println!("Wrote {} ads to {}", kept.len(), path.display());
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    Ok(())
}

/// One JSON object per page file mapping its name to the query result, the
/// shape the per-file extraction command reports.
fn extraction_report(
    dir: &std::path::Path,
    mode: QueryMode,
    key: &str,
    index: Option<usize>,
) -> Vec<Value> {
    let mut report = Vec::new();
    for path in corpus::page_files(dir) {
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                continue;
            }
        };
        let doc = match serde_json::from_str::<Value>(&text) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                continue;
            }
        };
        let matches = query::run_query(&doc, mode, key);
        let result = match index {
            Some(i) => matches.get(i).copied().cloned().unwrap_or(Value::Null),
            None => Value::Array(matches.into_iter().cloned().collect()),
        };
        let mut entry = serde_json::Map::new();
        entry.insert(name, result);
        report.push(Value::Object(entry));
    }
    report
}

fn print_aggregate(label: &str, value: Option<f64>, mode: QueryMode, key: &str) {
    let mode = match mode {
        QueryMode::Attribute => "attribute",
        QueryMode::Element => "element",
    };
    match value {
        Some(v) => println!("{label} of {key} ({mode}): {v}"),
        None => println!("No value found for {key} ({mode})"),
    }
}

fn print_summary(summary: &stats::Summary) {
    println!("Total ads: {}", summary.total_ads);

    let p = &summary.price_stats;
    println!("\n--- Prices ---");
    println!("count:  {}", p.count);
    println!("min:    {:.2}", p.min);
    println!("max:    {:.2}", p.max);
    println!("mean:   {:.2}", p.mean);
    println!("median: {:.2}", p.median);

    let dist = &summary.price_distribution;
    if !dist.ranges.is_empty() {
        println!("\n--- Price distribution ---");
        let max_count = dist.counts.iter().copied().max().unwrap_or(0);
        for (range, count) in dist.ranges.iter().zip(&dist.counts) {
            let bar = if max_count > 0 {
                "#".repeat(count * 20 / max_count)
            } else {
                String::new()
            };
            println!("{range:>18}: {bar} ({count})");
        }
    }

    print_counts("Brands", &summary.brand_stats);
    print_counts("Locations", &summary.location_stats);
}

fn print_counts(title: &str, counts: &[(String, usize)]) {
    if counts.is_empty() {
        return;
    }
    println!("\n--- {title} ---");
    for (name, count) in counts {
        println!("{name}: {count}");
    }
}

fn print_ads_table(ads: &[&Value]) {
    println!("{:>3} | {:>10} | {:<16} | {:<40}", "#", "Price", "City", "Title");
    println!("{}", "-".repeat(78));
    for (i, ad) in ads.iter().enumerate() {
        let price = ads::extract_price(ad)
            .map(|p| format!("{p:.0}"))
            .unwrap_or_else(|| "-".into());
        let city = ads::extract_location(ad).unwrap_or_else(|| "-".into());
        let title = ad.get("subject").and_then(Value::as_str).unwrap_or("-");
        println!(
            "{:>3} | {:>10} | {:<16} | {:<40}",
            i + 1,
            price,
            truncate(&city, 16),
            truncate(title, 40)
        );
    }
    println!("\n{} ads", ads.len());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

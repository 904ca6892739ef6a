use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use regex::Regex;
use serde_json::Value;
use tracing::{info, warn};

use crate::query::element;

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;
const PAGE_DELAY_SECS: (f64, f64) = (5.0, 10.0);
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

static PAGE_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(page=)\d+").unwrap());
static NEXT_DATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<script id="__NEXT_DATA__"[^>]*>(.*?)</script>"#).unwrap()
});
static DESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""description"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap());

/// Fetch `pages` search-result pages and write one `ads_<n>.json` per page
/// under `data_dir`. Returns the total number of ads written. A page that
/// fails to download or carries no ad payload is skipped, not fatal.
pub async fn fetch_ads(url: &str, pages: usize, data_dir: &Path) -> Result<usize> {
    let client = client()?;
    fs::create_dir_all(data_dir)
        .with_context(|| format!("creating {}", data_dir.display()))?;

    let pb = ProgressBar::new(pages as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} (eta {eta})")?
            .progress_chars("=> "),
    );

    let mut total_ads = 0usize;
    for page in 1..=pages {
        if page > 1 {
            sleep_between(PAGE_DELAY_SECS.0, PAGE_DELAY_SECS.1).await;
        }
        let page_url = with_page(url, page);
        match get_with_retry(&client, &page_url).await {
            Ok(html) => match extract_ads(&html) {
                Some(ads) => {
                    let path = data_dir.join(format!("ads_{page}.json"));
                    fs::write(&path, serde_json::to_string_pretty(&ads)?)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!("Wrote {} ads to {}", ads.len(), path.display());
                    total_ads += ads.len();
                }
                None => warn!("No ad payload found on page {page}"),
            },
            Err(e) => warn!("Page {page} failed: {e:#}"),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(total_ads)
}

/// Fetch a single ad page and pull its description text out of the embedded
/// JSON payload.
pub async fn fetch_description(url: &str) -> Result<String> {
    let client = client()?;
    let html = get_with_retry(&client, url).await?;
    let raw = DESCRIPTION_RE
        .captures(&html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| anyhow::anyhow!("no description found at {url}"))?;
    // The capture is still JSON-escaped; round-trip it through the parser.
    let unescaped: String = serde_json::from_str(&format!("\"{raw}\""))
        .context("description is not a valid JSON string")?;
    Ok(unescaped)
}

fn client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(15))
        .build()
        .context("building HTTP client")
}

/// Rewrite the `page=` query value; URLs without the parameter get it added.
fn with_page(url: &str, page: usize) -> String {
    if PAGE_PARAM_RE.is_match(url) {
        PAGE_PARAM_RE
            .replace(url, format!("${{1}}{page}"))
            .into_owned()
    } else if url.contains('?') {
        format!("{url}&page={page}")
    } else {
        format!("{url}?page={page}")
    }
}

async fn get_with_retry(client: &reqwest::Client, url: &str) -> Result<String> {
    let mut attempt = 0;
    loop {
        match client.get(url).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return Ok(resp.text().await?);
                }
                let retryable = status.as_u16() == 429 || status.is_server_error();
                if !retryable || attempt == MAX_RETRIES {
                    anyhow::bail!("GET {url} returned {status}");
                }
            }
            Err(e) if attempt < MAX_RETRIES => {
                warn!("GET {url} errored: {e}");
            }
            Err(e) => return Err(e.into()),
        }
        let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
        warn!(
            "Retrying {url} (attempt {}/{}) in {:.1}s",
            attempt + 1,
            MAX_RETRIES,
            backoff.as_secs_f64()
        );
        tokio::time::sleep(backoff).await;
        attempt += 1;
    }
}

async fn sleep_between(min: f64, max: f64) {
    let secs = rand::thread_rng().gen_range(min..max);
    tokio::time::sleep(Duration::from_secs_f64(secs)).await;
}

/// Pull the embedded `__NEXT_DATA__` JSON out of a search-result page and
/// locate the first ads array inside it, wherever the site nests it.
fn extract_ads(html: &str) -> Option<Vec<Value>> {
    let payload = NEXT_DATA_RE.captures(html)?.get(1)?.as_str();
    let doc: Value = serde_json::from_str(payload).ok()?;
    element::get_element(&doc, "ads")
        .into_iter()
        .find_map(|v| v.as_array().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_number_substitution() {
        assert_eq!(
            with_page("https://www.example.org/recherche?text=clio&page=0", 2),
            "https://www.example.org/recherche?text=clio&page=2"
        );
        assert_eq!(
            with_page("https://www.example.org/recherche?text=clio", 3),
            "https://www.example.org/recherche?text=clio&page=3"
        );
        assert_eq!(
            with_page("https://www.example.org/recherche", 1),
            "https://www.example.org/recherche?page=1"
        );
    }

    #[test]
    fn ads_extracted_from_search_page() {
        let html = std::fs::read_to_string("tests/fixtures/search_page.html").unwrap();
        let ads = extract_ads(&html).unwrap();
        assert_eq!(ads.len(), 2);
        assert_eq!(ads[0]["subject"], "Renault Clio IV 1.5 dCi");
    }

    #[test]
    fn page_without_payload_yields_none() {
        assert!(extract_ads("<html><body>blocked</body></html>").is_none());
        assert!(extract_ads(r#"<script id="__NEXT_DATA__">{}</script>"#).is_none());
    }

    #[test]
    fn description_capture_unescapes() {
        let html = r#"{"description": "Belle voiture,\nnon fumeur \"garantie\""}"#;
        let raw = DESCRIPTION_RE.captures(html).unwrap()[1].to_string();
        let unescaped: String = serde_json::from_str(&format!("\"{raw}\"")).unwrap();
        assert_eq!(unescaped, "Belle voiture,\nnon fumeur \"garantie\"");
    }
}

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::ads::stringify;
use crate::query::{attribute, coerce::coerce, element};

/// Attribute keys and element names tried, in order, when locating an ad.
const LOCATION_KEYS: &[&str] = &["location", "city", "ville"];

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct PriceStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

#[derive(Debug, Default, Serialize)]
pub struct PriceDistribution {
    pub ranges: Vec<String>,
    pub counts: Vec<usize>,
    pub total_ads: usize,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total_ads: usize,
    pub price_stats: PriceStats,
    pub price_distribution: PriceDistribution,
    pub brand_stats: Vec<(String, usize)>,
    pub location_stats: Vec<(String, usize)>,
}

/// Every coercible `price` match across the given ads. Unlike the canonical
/// per-ad price this keeps all matches, one series entry each.
fn price_series(ads: &[Value]) -> Vec<f64> {
    ads.iter()
        .flat_map(|ad| element::get_element(ad, "price"))
        .filter_map(coerce)
        .collect()
}

pub fn price_statistics(ads: &[Value]) -> PriceStats {
    let mut prices = price_series(ads);
    if prices.is_empty() {
        return PriceStats::default();
    }
    prices.sort_by(f64::total_cmp);
    let count = prices.len();
    let mean = prices.iter().sum::<f64>() / count as f64;
    let median = if count % 2 == 1 {
        prices[count / 2]
    } else {
        (prices[count / 2 - 1] + prices[count / 2]) / 2.0
    };
    PriceStats {
        count,
        min: prices[0],
        max: prices[count - 1],
        mean,
        median,
    }
}

/// Equal-width histogram over [min, max). Bins are half-open so the single
/// maximum price lands in no bin, matching how callers render the ranges.
pub fn price_distribution(ads: &[Value], bins: usize) -> PriceDistribution {
    let prices = price_series(ads);
    if prices.is_empty() || bins == 0 {
        return PriceDistribution::default();
    }
    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let bin_size = (max - min) / bins as f64;

    let mut ranges = Vec::with_capacity(bins);
    let mut counts = Vec::with_capacity(bins);
    for i in 0..bins {
        let start = min + i as f64 * bin_size;
        let end = min + (i + 1) as f64 * bin_size;
        ranges.push(format!("{start:.0}-{end:.0}€"));
        counts.push(prices.iter().filter(|p| start <= **p && **p < end).count());
    }
    PriceDistribution {
        ranges,
        counts,
        total_ads: prices.len(),
    }
}

/// Ad counts per brand attribute, most frequent first.
pub fn brand_statistics(ads: &[Value]) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for ad in ads {
        if let Some(first) = attribute::get_attribute_at(ad, "brand", 0) {
            let brand = stringify(first).trim().to_string();
            if !brand.is_empty() {
                *counts.entry(brand).or_default() += 1;
            }
        }
    }
    sorted_desc(counts)
}

/// Ad counts per location, most frequent first. Tries the location-like
/// attribute keys before falling back to element lookup, same order.
pub fn location_statistics(ads: &[Value]) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for ad in ads {
        if let Some(location) = ad_location(ad) {
            *counts.entry(location).or_default() += 1;
        }
    }
    sorted_desc(counts)
}

fn ad_location(ad: &Value) -> Option<String> {
    for key in LOCATION_KEYS {
        if let Some(v) = attribute::get_attribute_at(ad, key, 0) {
            let s = stringify(v).trim().to_string();
            if !s.is_empty() {
                return Some(s);
            }
        }
    }
    for key in LOCATION_KEYS {
        if let Some(v) = element::get_element_at(ad, key, 0) {
            let s = stringify(v).trim().to_string();
            if !s.is_empty() {
                return Some(s);
            }
        }
    }
    None
}

fn sorted_desc(counts: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut out: Vec<_> = counts.into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

pub fn summary(ads: &[Value]) -> Summary {
    Summary {
        total_ads: ads.len(),
        price_stats: price_statistics(ads),
        price_distribution: price_distribution(ads, 10),
        brand_stats: brand_statistics(ads),
        location_stats: location_statistics(ads),
    }
}

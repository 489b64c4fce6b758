//! Image normalization and deduplication.
//!
//! Candidates from every strategy funnel through here: URLs are resolved
//! to absolute form, grouped by comparison key (volatile query parameters
//! ignored), merged, classified for alt-text quality, optionally collapsed
//! across responsive size variants, and enriched with byte sizes through
//! a bounded concurrent lookup pool.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::AnalyzeConfig;
use crate::discover::ImageCandidate;
use crate::page::PageDriver;
use crate::patterns::{FILENAME_ALT, PLACEHOLDER_ALT, URL_DIMENSIONS};
use crate::result::{AltQuality, DiscoveryStrategy, NormalizedImage};
use crate::url_utils;

/// Output of the normalization step.
#[derive(Debug)]
pub struct NormalizeOutcome {
    /// Deduplicated, enriched image records, discovery order preserved.
    pub images: Vec<NormalizedImage>,
    /// Non-fatal issues encountered.
    pub warnings: Vec<String>,
    /// The size-enrichment budget ran out or the step was cancelled.
    pub truncated: bool,
}

struct ImageGroup {
    url: String,
    key: String,
    alt: Option<String>,
    title: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    strategies: BTreeSet<DiscoveryStrategy>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Normalize raw candidates into the deduplicated image inventory.
///
/// Never fails: unresolvable URLs are dropped with a warning, failed or
/// cancelled size lookups leave `byte_size` unset.
pub async fn normalize<D: PageDriver + ?Sized>(
    candidates: Vec<ImageCandidate>,
    driver: &D,
    config: &AnalyzeConfig,
    cancel: &CancellationToken,
) -> NormalizeOutcome {
    let mut warnings = Vec::new();
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, ImageGroup> = HashMap::new();
    let mut unresolved = 0usize;

    for candidate in candidates {
        let Some(absolute) = driver.resolve_url(&candidate.source_url) else {
            unresolved += 1;
            continue;
        };
        let key = url_utils::comparison_key(&absolute, &config.volatile_query_params);
        let alt = trimmed(candidate.alt_text).or_else(|| trimmed(candidate.aria_label));

        let entry = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            ImageGroup {
                url: absolute.clone(),
                key,
                alt: None,
                title: None,
                width: None,
                height: None,
                strategies: BTreeSet::new(),
            }
        });
        entry.strategies.insert(candidate.strategy);
        if entry.alt.is_none() {
            entry.alt = alt;
        }
        if entry.title.is_none() {
            entry.title = trimmed(candidate.title);
        }
        if entry.width.is_none() {
            entry.width = candidate.declared_width;
        }
        if entry.height.is_none() {
            entry.height = candidate.declared_height;
        }
    }

    if unresolved > 0 {
        warnings.push(format!(
            "{unresolved} candidate(s) dropped: unresolvable source URL"
        ));
    }

    let mut ordered: Vec<ImageGroup> = order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .collect();

    if config.collapse_responsive_variants {
        ordered = collapse_variants(ordered);
    }

    let urls: Vec<String> = ordered.iter().map(|g| g.url.clone()).collect();
    let (sizes, truncated) = resolve_sizes(driver, urls, config, cancel).await;
    if truncated {
        warnings.push("size enrichment truncated by budget or cancellation".to_string());
    }

    let page_host = driver
        .base_url()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase));

    let images = ordered
        .into_iter()
        .map(|group| {
            let alt_quality = classify_alt(group.alt.as_deref(), &group.url);
            let byte_size = sizes.get(&group.url).copied().flatten();
            let from_cdn = match (&page_host, url_utils::host_of(&group.url)) {
                (Some(page), Some(host)) => host != *page,
                _ => false,
            };
            NormalizedImage {
                url: group.url,
                comparison_key: group.key,
                alt_text: group.alt,
                title: group.title,
                byte_size,
                alt_quality,
                strategies: group.strategies,
                width: group.width,
                height: group.height,
                from_cdn,
            }
        })
        .collect();

    NormalizeOutcome {
        images,
        warnings,
        truncated,
    }
}

/// Classify alt-text quality against the image's own URL.
#[must_use]
pub fn classify_alt(alt: Option<&str>, url: &str) -> AltQuality {
    let Some(alt) = alt.map(str::trim).filter(|a| !a.is_empty()) else {
        return AltQuality::Missing;
    };

    let name = url_utils::file_name(url);
    let stem = url_utils::file_stem(&name);
    let echoes_filename = alt.eq_ignore_ascii_case(&name)
        || (!stem.is_empty() && alt.eq_ignore_ascii_case(stem));

    if echoes_filename || PLACEHOLDER_ALT.is_match(alt) || FILENAME_ALT.is_match(alt) {
        AltQuality::Placeholder
    } else {
        AltQuality::Present
    }
}

/// Collapse responsive size variants of the same image, keeping the
/// best-scoring one and merging the metadata of the rest.
fn collapse_variants(groups: Vec<ImageGroup>) -> Vec<ImageGroup> {
    let mut buckets: Vec<Vec<ImageGroup>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for group in groups {
        let signature = url_utils::variant_signature(&group.url)
            .map(|sig| format!("{sig}|{}", group.alt.as_deref().unwrap_or("")));
        match signature {
            Some(sig) => {
                if let Some(&at) = index.get(&sig) {
                    buckets[at].push(group);
                } else {
                    index.insert(sig, buckets.len());
                    buckets.push(vec![group]);
                }
            }
            None => buckets.push(vec![group]),
        }
    }

    buckets.into_iter().filter_map(select_best_variant).collect()
}

fn select_best_variant(mut variants: Vec<ImageGroup>) -> Option<ImageGroup> {
    if variants.len() <= 1 {
        return variants.pop();
    }

    let mut best_at = 0;
    let mut best_score = i32::MIN;
    for (at, variant) in variants.iter().enumerate() {
        let score = variant_score(variant);
        if score > best_score {
            best_score = score;
            best_at = at;
        }
    }

    let mut best = variants.remove(best_at);
    for other in variants {
        if best.alt.is_none() {
            best.alt = other.alt;
        }
        if best.title.is_none() {
            best.title = other.title;
        }
        if best.width.is_none() {
            best.width = other.width;
        }
        if best.height.is_none() {
            best.height = other.height;
        }
        best.strategies.extend(other.strategies);
    }
    Some(best)
}

/// Heuristic preference among size variants: mid-sized standard images
/// beat thumbnails, scaled-up assets, and backgrounds.
fn variant_score(group: &ImageGroup) -> i32 {
    let url = group.url.to_lowercase();
    let mut score = 0;

    if group.alt.as_deref().is_some_and(|a| a.len() > 3) {
        score += 10;
    }
    if group.title.is_some() {
        score += 5;
    }
    if group.strategies.contains(&DiscoveryStrategy::StandardTag) {
        score += 15;
    }
    if group.strategies.contains(&DiscoveryStrategy::SourceSet) {
        score += 10;
    }
    if group.strategies.contains(&DiscoveryStrategy::CssBackground) {
        score += 5;
    }

    let width = URL_DIMENSIONS
        .captures(&url)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .or(group.width);
    if let Some(width) = width {
        score += match width {
            800..=1200 => 20,
            500..=799 => 15,
            1201..=1600 => 10,
            300..=499 => 5,
            _ if width > 1600 => 3,
            _ => 0,
        };
    }

    if url.contains("medium") {
        score += 12;
    } else if url.contains("large") {
        score += 8;
    } else if url.contains("small") || url.contains("thumb") {
        score -= 5;
    }
    if url.contains("@2x") || url.contains("@3x") {
        score -= 3;
    }
    if url.ends_with(".jpg") || url.ends_with(".jpeg") || url.ends_with(".png") {
        score += 5;
    } else if url.ends_with(".webp") {
        score += 3;
    }

    score
}

/// Resolve byte sizes for each unique URL through a bounded pool.
///
/// Lookups are independent: each one holds a semaphore permit, runs under
/// its own timeout, and records into a shared map. The whole pool races
/// the step budget and the cancellation token; whatever resolved before
/// either fires is kept, everything else stays unknown.
async fn resolve_sizes<D: PageDriver + ?Sized>(
    driver: &D,
    urls: Vec<String>,
    config: &AnalyzeConfig,
    cancel: &CancellationToken,
) -> (HashMap<String, Option<u64>>, bool) {
    if urls.is_empty() {
        return (HashMap::new(), false);
    }
    if cancel.is_cancelled() {
        return (HashMap::new(), true);
    }

    let semaphore = Arc::new(Semaphore::new(config.size_fetch_concurrency));
    let resolved: Mutex<HashMap<String, Option<u64>>> = Mutex::new(HashMap::new());
    let per_lookup = Duration::from_millis(config.size_fetch_timeout_ms);

    let pool = futures::future::join_all(urls.iter().map(|url| {
        let semaphore = Arc::clone(&semaphore);
        let resolved = &resolved;
        async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return;
            };
            if cancel.is_cancelled() {
                return;
            }
            let size = match tokio::time::timeout(per_lookup, driver.fetch_resource_size(url)).await
            {
                Ok(size) => size,
                Err(_) => {
                    debug!(%url, "size lookup timed out");
                    None
                }
            };
            if let Ok(mut map) = resolved.lock() {
                map.insert(url.clone(), size);
            }
        }
    }));

    let budget = Duration::from_millis(config.normalize_budget_ms);
    let truncated = tokio::select! {
        biased;
        _ = pool => false,
        () = cancel.cancelled() => {
            debug!("size lookups cancelled, abandoning the rest");
            true
        }
        () = tokio::time::sleep(budget) => {
            warn!("size enrichment exceeded its budget");
            true
        }
    };

    // A cancellation can also let the pool drain early; either way the
    // step did not run to natural completion.
    let truncated = truncated || cancel.is_cancelled();

    let map = resolved.into_inner().unwrap_or_default();
    (map, truncated)
}

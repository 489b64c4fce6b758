//! Markup-level image strategies: `img` sources, responsive source sets,
//! and deferred lazy-load attributes.

use tracing::trace;

use crate::config::AnalyzeConfig;
use crate::page::{DriverError, ElementRef, PageDriver};
use crate::result::DiscoveryStrategy;

use super::{DocumentContext, ImageCandidate};

/// One parsed `srcset` entry.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SrcsetEntry {
    pub url: String,
    /// Sort weight: `x` densities scaled so they outrank `w` widths.
    pub weight: f64,
    /// Declared width when the descriptor was a `Nw` form.
    pub width: Option<u32>,
}

/// Parse the `srcset` attribute grammar: comma-separated
/// `url [descriptor]` pairs, descriptors being `Nx` densities or `Nw`
/// widths. Entries come back sorted best-first.
pub(crate) fn parse_srcset(value: &str) -> Vec<SrcsetEntry> {
    let mut entries: Vec<SrcsetEntry> = Vec::new();

    for part in value.split(',') {
        let mut tokens = part.split_whitespace();
        let Some(url) = tokens.next() else { continue };
        if url.is_empty() || url.starts_with("data:") {
            continue;
        }

        let (weight, width) = match tokens.next() {
            Some(descriptor) => {
                if let Some(density) = descriptor.strip_suffix(['x', 'X']) {
                    (density.parse::<f64>().unwrap_or(1.0) * 10_000.0, None)
                } else if let Some(w) = descriptor.strip_suffix(['w', 'W']) {
                    let width = w.parse::<u32>().ok();
                    (f64::from(width.unwrap_or(0)), width)
                } else {
                    (0.0, None)
                }
            }
            None => (10_000.0, None), // bare URL counts as 1x
        };

        entries.push(SrcsetEntry {
            url: url.to_string(),
            weight,
            width,
        });
    }

    entries.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    entries
}

struct ImgAttrs {
    alt: Option<String>,
    title: Option<String>,
    aria_label: Option<String>,
    src: Option<String>,
    srcset: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn usable_url(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty() || value.starts_with("data:") || value.starts_with("javascript:") {
        None
    } else {
        Some(value)
    }
}

async fn read_img_attrs<D: PageDriver + ?Sized>(
    driver: &D,
    el: &ElementRef,
) -> Result<ImgAttrs, DriverError> {
    Ok(ImgAttrs {
        alt: driver.get_attribute(el, "alt").await?,
        title: non_empty(driver.get_attribute(el, "title").await?),
        aria_label: non_empty(driver.get_attribute(el, "aria-label").await?),
        src: driver.get_attribute(el, "src").await?,
        srcset: driver.get_attribute(el, "srcset").await?,
        width: driver
            .get_attribute(el, "width")
            .await?
            .and_then(|v| v.trim().parse().ok()),
        height: driver
            .get_attribute(el, "height")
            .await?
            .and_then(|v| v.trim().parse().ok()),
    })
}

/// Scan one context for `img` and `picture > source` image references.
///
/// Tie-break: an element carrying any deferred-source attribute is
/// assumed to hold a placeholder in its live `src`; the deferred URLs
/// win and the placeholder is discarded.
pub(crate) async fn scan<D: PageDriver + ?Sized>(
    driver: &D,
    config: &AnalyzeConfig,
    context: &DocumentContext,
) -> Result<Vec<ImageCandidate>, DriverError> {
    let mut out = Vec::new();

    for el in driver.query_selector_all(context.ctx, "img").await? {
        let Ok(attrs) = read_img_attrs(driver, &el).await else {
            continue; // stale between query and read
        };

        let candidate = |url: &str, strategy, width, height| ImageCandidate {
            source_url: url.to_string(),
            alt_text: attrs.alt.clone(),
            title: attrs.title.clone(),
            aria_label: attrs.aria_label.clone(),
            strategy,
            origin: context.ctx,
            origin_kind: context.kind,
            declared_width: width,
            declared_height: height,
        };

        let mut deferred_urls: Vec<String> = Vec::new();
        for attr in &config.deferred_source_attrs {
            let Ok(Some(value)) = driver.get_attribute(&el, attr).await else {
                continue;
            };
            if attr.contains("srcset") {
                deferred_urls.extend(parse_srcset(&value).into_iter().map(|e| e.url));
            } else if let Some(url) = usable_url(&value) {
                deferred_urls.push(url.to_string());
            }
        }

        if deferred_urls.is_empty() {
            if let Some(src) = attrs.src.as_deref().and_then(usable_url) {
                out.push(candidate(
                    src,
                    DiscoveryStrategy::StandardTag,
                    attrs.width,
                    attrs.height,
                ));
            }
        } else {
            trace!(urls = deferred_urls.len(), "deferred source wins over live src");
            for url in &deferred_urls {
                out.push(candidate(
                    url,
                    DiscoveryStrategy::DeferredAttribute,
                    attrs.width,
                    attrs.height,
                ));
            }
        }

        if let Some(srcset) = attrs.srcset.as_deref() {
            for entry in parse_srcset(srcset) {
                out.push(candidate(
                    &entry.url,
                    DiscoveryStrategy::SourceSet,
                    entry.width.or(attrs.width),
                    attrs.height,
                ));
            }
        }
    }

    for el in driver
        .query_selector_all(context.ctx, "picture > source")
        .await?
    {
        let Ok(srcset) = driver.get_attribute(&el, "srcset").await else {
            continue;
        };
        let Some(srcset) = srcset else { continue };
        for entry in parse_srcset(&srcset) {
            out.push(ImageCandidate {
                source_url: entry.url,
                alt_text: None,
                title: None,
                aria_label: None,
                strategy: DiscoveryStrategy::SourceSet,
                origin: context.ctx,
                origin_kind: context.kind,
                declared_width: entry.width,
                declared_height: None,
            });
        }
    }

    Ok(out)
}

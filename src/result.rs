//! Result types for page analysis output.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How an image candidate was found.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryStrategy {
    /// A regular `img` element's resolved source.
    StandardTag,
    /// A `srcset` entry on an `img` or `picture > source` element.
    SourceSet,
    /// A `url(...)` reference in a computed `background-image`.
    CssBackground,
    /// A deferred lazy-load attribute (`data-src` and friends).
    DeferredAttribute,
    /// A string harvested from script-exposed gallery state.
    ScriptState,
}

/// Quality classification of an image's alternative text.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum AltQuality {
    /// No alt text, or empty after trimming.
    #[default]
    Missing,
    /// Low-information alt text: a filename echo or a generic token.
    Placeholder,
    /// Descriptive alt text.
    Present,
}

/// A deduplicated, metadata-enriched image record.
///
/// Unique by `comparison_key` across one analysis result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedImage {
    /// Absolute URL as found on the page, query string intact.
    pub url: String,

    /// Grouping key: `url` minus fragment and volatile query parameters.
    pub comparison_key: String,

    /// Merged alt text (first non-empty among the candidates).
    pub alt_text: Option<String>,

    /// Merged title attribute.
    pub title: Option<String>,

    /// Resource size in bytes, when the lookup succeeded.
    pub byte_size: Option<u64>,

    /// Alt-text quality classification.
    pub alt_quality: AltQuality,

    /// Every strategy that surfaced this image.
    pub strategies: BTreeSet<DiscoveryStrategy>,

    /// Declared width, when an element carried one.
    pub width: Option<u32>,

    /// Declared height, when an element carried one.
    pub height: Option<u32>,

    /// Whether the image is served from a host other than the page's.
    pub from_cdn: bool,
}

/// A page heading, levels 1-3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    /// Heading level: 1, 2 or 3.
    pub level: u8,
    /// Trimmed heading text, never empty.
    pub text: String,
}

/// Outcome of the consent-overlay scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentOutcome {
    /// An overlay was found.
    pub detected: bool,
    /// The accept control was clicked successfully.
    pub dismissed: bool,
    /// The selector or phrase that matched.
    pub matched_pattern: Option<String>,
}

/// Aggregate result of one page analysis.
///
/// Created fresh per invocation and never mutated after being returned.
/// Every field degrades to empty rather than failing: the caller always
/// receives a result, possibly partial (see [`PageContentResult::truncated`]).
#[derive(Debug, Clone)]
pub struct PageContentResult {
    /// Page URL, when the driver knows its base.
    pub url: Option<String>,

    /// Declared page title, falling back to the first `h1`.
    pub title: Option<String>,

    /// Headings in document order, levels 1-3, empty ones excluded.
    pub headlines: Vec<Headline>,

    /// Visible text of the main content region, whitespace collapsed.
    pub text_content: String,

    /// Deduplicated image inventory, unfiltered.
    pub images: Vec<NormalizedImage>,

    /// Consent-overlay scan outcome.
    pub consent: ConsentOutcome,

    /// A step ran out of budget or the analysis was cancelled; the
    /// fields hold everything collected up to that point.
    pub truncated: bool,

    /// Non-fatal issues encountered during analysis.
    pub warnings: Vec<String>,

    /// When this analysis ran.
    pub analyzed_at: DateTime<Utc>,
}

impl PageContentResult {
    /// Filtered view of the image inventory: records whose resolved size
    /// is below `min_bytes` are excluded.
    ///
    /// Records with an unknown size are retained; the filter only drops
    /// images positively known to be small. The underlying `images` list
    /// is always complete; this is a presentation-layer view.
    #[must_use]
    pub fn images_above(&self, min_bytes: u64) -> Vec<&NormalizedImage> {
        self.images
            .iter()
            .filter(|img| img.byte_size.is_none_or(|size| size >= min_bytes))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(url: &str, byte_size: Option<u64>) -> NormalizedImage {
        NormalizedImage {
            url: url.to_string(),
            comparison_key: url.to_string(),
            alt_text: None,
            title: None,
            byte_size,
            alt_quality: AltQuality::Missing,
            strategies: BTreeSet::new(),
            width: None,
            height: None,
            from_cdn: false,
        }
    }

    fn result_with(images: Vec<NormalizedImage>) -> PageContentResult {
        PageContentResult {
            url: None,
            title: None,
            headlines: Vec::new(),
            text_content: String::new(),
            images,
            consent: ConsentOutcome::default(),
            truncated: false,
            warnings: Vec::new(),
            analyzed_at: Utc::now(),
        }
    }

    #[test]
    fn images_above_drops_known_small_images() {
        let result = result_with(vec![
            image("https://example.com/big.jpg", Some(20_000)),
            image("https://example.com/small.jpg", Some(4_096)),
            image("https://example.com/unknown.jpg", None),
        ]);

        let filtered = result.images_above(10_240);
        let urls: Vec<&str> = filtered.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://example.com/big.jpg", "https://example.com/unknown.jpg"]
        );
        // The unfiltered inventory is untouched.
        assert_eq!(result.images.len(), 3);
    }

    #[test]
    fn images_above_zero_keeps_everything() {
        let result = result_with(vec![image("https://example.com/a.jpg", Some(1))]);
        assert_eq!(result.images_above(0).len(), 1);
    }
}

//! Compiled regex patterns used across discovery and normalization.
//!
//! All patterns are compiled once at startup using `LazyLock`.

#![allow(clippy::expect_used)]

use std::sync::LazyLock;

use regex::Regex;

/// Matches strings that look like an image resource URL.
///
/// Used to filter values harvested from script-exposed state, where
/// arbitrary strings turn up next to real image references.
pub static IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(jpe?g|png|gif|webp|svg|avif|bmp|ico)(\?[^\s]*)?$")
        .expect("IMAGE_URL regex")
});

/// Extracts `url(...)` references from CSS property values.
///
/// Handles optional single/double quoting; multiple references in one
/// value (layered backgrounds) are all captured.
pub static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*['"]?([^'")]+?)['"]?\s*\)"#).expect("CSS_URL regex")
});

/// Matches low-information alt text: generic tokens optionally followed by
/// digits or separators ("image", "photo 3", "img_0042").
pub static PLACEHOLDER_ALT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(image|img|photo|picture|pic|icon|logo|banner|thumb(?:nail)?|placeholder|untitled)[\s\d_.-]*$")
        .expect("PLACEHOLDER_ALT regex")
});

/// Matches alt text that is just a filename with an image extension.
pub static FILENAME_ALT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\w%,-]+\.(jpe?g|png|gif|webp|svg|avif|bmp|ico)$")
        .expect("FILENAME_ALT regex")
});

/// Matches size-variant suffixes in file stems: `-800x600`, `_large`,
/// `@2x`, `-thumb`, `_300w` and friends.
pub static SIZE_VARIANT_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([-_](\d{2,4}x\d{2,4}|\d{2,4}(w|h|px)|small|medium|large|thumb(?:nail)?|retina)|@\dx)")
        .expect("SIZE_VARIANT_SUFFIX regex")
});

/// Captures `WxH` pixel dimensions embedded in a URL.
pub static URL_DIMENSIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{2,4})x(\d{2,4})").expect("URL_DIMENSIONS regex")
});

/// Matches object keys worth descending into when harvesting
/// script-exposed state.
pub static SCRIPT_STATE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(image|img|thumb|src|source|url|background|photo|media|gallery|slide)")
        .expect("SCRIPT_STATE_KEY regex")
});

/// Matches multiple whitespace characters for normalization.
pub static WHITESPACE_NORMALIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_NORMALIZE regex"));

/// Extracts a charset label from an HTML `<meta>` declaration.
pub static CHARSET_META: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([a-zA-Z0-9_-]+)"#)
        .expect("CHARSET_META regex")
});

/// Captures the content of a declarative shadow-root template.
///
/// Non-greedy: nested templates are not supported.
pub static SHADOW_TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<template[^>]*\bshadowrootmode\b[^>]*>(.*?)</template>")
        .expect("SHADOW_TEMPLATE regex")
});

/// Collect every `url(...)` reference in a CSS value.
#[must_use]
pub fn css_urls(value: &str) -> Vec<String> {
    CSS_URL
        .captures_iter(value)
        .map(|c| c[1].trim().to_string())
        .filter(|u| !u.is_empty())
        .collect()
}

/// Collapse runs of whitespace to single spaces and trim the ends.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_NORMALIZE.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_url_matches_common_extensions() {
        assert!(IMAGE_URL.is_match("https://example.com/a.jpg"));
        assert!(IMAGE_URL.is_match("/images/photo.webp?w=800"));
        assert!(IMAGE_URL.is_match("hero.PNG"));
        assert!(!IMAGE_URL.is_match("https://example.com/page.html"));
        assert!(!IMAGE_URL.is_match("not a url"));
    }

    #[test]
    fn css_urls_handles_quoting_and_layers() {
        assert_eq!(
            css_urls(r#"url("https://example.com/bg.png")"#),
            vec!["https://example.com/bg.png"]
        );
        assert_eq!(css_urls("url('/a.jpg'), url(/b.jpg)"), vec!["/a.jpg", "/b.jpg"]);
        assert!(css_urls("none").is_empty());
    }

    #[test]
    fn placeholder_alt_matches_generic_tokens() {
        assert!(PLACEHOLDER_ALT.is_match("image"));
        assert!(PLACEHOLDER_ALT.is_match("Photo 3"));
        assert!(PLACEHOLDER_ALT.is_match("img_0042"));
        assert!(!PLACEHOLDER_ALT.is_match("Golden Gate Bridge at sunset"));
    }

    #[test]
    fn filename_alt_matches_bare_filenames() {
        assert!(FILENAME_ALT.is_match("photo.jpg"));
        assert!(FILENAME_ALT.is_match("hero-image.webp"));
        assert!(!FILENAME_ALT.is_match("A photo of a bridge"));
    }

    #[test]
    fn size_variant_suffix_strips_expected_forms() {
        for stem in ["cat-800x600", "cat_large", "cat@2x", "cat-thumb", "cat_300w"] {
            assert!(SIZE_VARIANT_SUFFIX.is_match(stem), "{stem} should match");
        }
        assert!(!SIZE_VARIANT_SUFFIX.is_match("cat"));
    }

    #[test]
    fn collapse_whitespace_flattens_runs() {
        assert_eq!(collapse_whitespace("  a\n\t b   c "), "a b c");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn charset_meta_extracts_label() {
        let html = r#"<meta http-equiv="Content-Type" content="text/html; charset=ISO-8859-1">"#;
        let caps = CHARSET_META.captures(html).map(|c| c[1].to_string());
        assert_eq!(caps.as_deref(), Some("ISO-8859-1"));
    }
}

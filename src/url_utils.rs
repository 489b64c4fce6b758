//! URL utilities for candidate resolution and deduplication.
//!
//! Provides absolute-URL resolution against a page base, comparison keys
//! that ignore volatile cache-busting query parameters, and the
//! filename/signature helpers used when collapsing responsive variants.

use url::Url;

use crate::patterns::SIZE_VARIANT_SUFFIX;

/// Schemes that never resolve to a fetchable image resource.
const OPAQUE_SCHEMES: &[&str] = &["data:", "javascript:", "about:", "mailto:", "tel:"];

/// Check whether a string is an absolute http(s) URL.
#[must_use]
pub fn is_http_url(s: &str) -> bool {
    let s = s.trim();
    (s.starts_with("http://") || s.starts_with("https://"))
        && Url::parse(s).map(|u| u.host().is_some()).unwrap_or(false)
}

/// Resolve a candidate URL to absolute form against an optional base.
///
/// Returns `None` for empty input, opaque schemes (`data:`,
/// `javascript:`, …), and relative references that cannot be resolved
/// because no base is available.
#[must_use]
pub fn to_absolute(candidate: &str, base: Option<&Url>) -> Option<String> {
    let candidate = candidate.trim();

    if candidate.is_empty() {
        return None;
    }
    if OPAQUE_SCHEMES.iter().any(|s| candidate.starts_with(s)) {
        return None;
    }
    if is_http_url(candidate) {
        return Some(candidate.to_string());
    }

    let resolved = base?.join(candidate).ok()?;
    if resolved.host().is_some() {
        Some(resolved.to_string())
    } else {
        None
    }
}

/// Compute the comparison key for an absolute URL.
///
/// The key lowercases the host, drops the fragment, and removes query
/// pairs whose name is in the volatile-parameter table. A table entry
/// ending in `*` matches by prefix (`utm_*`). The original URL is left
/// untouched; the key exists only for grouping.
#[must_use]
pub fn comparison_key(absolute: &str, volatile_params: &[String]) -> String {
    let Ok(mut url) = Url::parse(absolute) else {
        return absolute.to_string();
    };

    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !is_volatile(name, volatile_params))
        .map(|(n, v)| (n.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        let joined = kept
            .iter()
            .map(|(n, v)| {
                if v.is_empty() {
                    n.clone()
                } else {
                    format!("{n}={v}")
                }
            })
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&joined));
    }

    if let Some(host) = url.host_str().map(str::to_ascii_lowercase) {
        // set_host only fails on cannot-be-a-base URLs, excluded above
        let _ = url.set_host(Some(&host));
    }

    url.to_string()
}

fn is_volatile(name: &str, volatile_params: &[String]) -> bool {
    volatile_params.iter().any(|p| {
        if let Some(prefix) = p.strip_suffix('*') {
            name.len() >= prefix.len() && name[..prefix.len()].eq_ignore_ascii_case(prefix)
        } else {
            name.eq_ignore_ascii_case(p)
        }
    })
}

/// Extract the filename portion of a URL, without query or fragment.
#[must_use]
pub fn file_name(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let name = without_query.rsplit('/').next().unwrap_or("").trim();

    if name.is_empty() || name == "." || name == ".." {
        return String::new();
    }
    name.to_string()
}

/// The filename stem, with the extension removed.
#[must_use]
pub fn file_stem(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}

/// Host of an absolute URL, lowercased.
#[must_use]
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

/// Grouping signature for responsive variants of the same image.
///
/// Same signature means: same registrable host (common asset-subdomain
/// prefixes like `cdn.` or `img.` collapsed), same path once size
/// suffixes (`-800x600`, `_large`, `@2x`, …) are stripped from the
/// filename stem.
#[must_use]
pub fn variant_signature(absolute: &str) -> Option<String> {
    let url = Url::parse(absolute).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let path = url.path();

    let name = file_name(path);
    if name.is_empty() {
        return None;
    }
    let stem = file_stem(&name);
    let ext = name.strip_prefix(stem).unwrap_or("");
    let stripped = SIZE_VARIANT_SUFFIX.replace_all(stem, "");
    let dir = &path[..path.len() - name.len()];

    Some(format!("{}{dir}{stripped}{ext}", strip_asset_subdomain(&host)))
}

/// Collapse common asset-serving subdomains so `cdn.example.com` and
/// `www.example.com` group together.
fn strip_asset_subdomain(host: &str) -> String {
    const ASSET_LABELS: &[&str] = &["cdn", "img", "images", "static", "media", "assets", "www"];

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() > 2 && ASSET_LABELS.contains(&labels[0]) {
        labels[1..].join(".")
    } else {
        host.to_string()
    }
}

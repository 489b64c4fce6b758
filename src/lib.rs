//! # pagesift
//!
//! Structured content and image-inventory extraction from rendered web
//! pages.
//!
//! The hard part of scraping a modern page is not fetching it. It is
//! finding the images. They hide in shadow roots, nested documents,
//! `srcset` grammars, computed backgrounds, lazy-load placeholder
//! attributes, and gallery state parked on `window`. pagesift runs a
//! fixed set of discovery strategies over every accessible document
//! context, deduplicates the hits behind cache-buster query strings,
//! scores their alt text, and enriches them with byte sizes, after
//! first dismissing the consent overlay (in eight languages) that would
//! otherwise keep content out of the DOM.
//!
//! Rendering is someone else's job: the pipeline talks to the page
//! through the [`PageDriver`] trait. Hook it up to a WebDriver or CDP
//! session, or use the bundled [`StaticSnapshot`] for fixed HTML.
//!
//! ## Quick Start
//!
//! ```rust
//! use pagesift::{analyze_page, AnalyzeConfig, StaticSnapshot};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let page = StaticSnapshot::from_html(
//!     r#"<html>
//!          <head><title>Bridges</title></head>
//!          <body><h1>Bridges</h1><img src="/golden-gate.jpg" alt="Golden Gate at dusk"></body>
//!        </html>"#,
//! )
//! .with_base_url("https://example.com/");
//!
//! let config = AnalyzeConfig {
//!     lazy_load_pause_ms: 0,
//!     consent_settle_ms: 0,
//!     ..AnalyzeConfig::default()
//! };
//!
//! let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
//! let result = rt.block_on(analyze_page(&page, &config))?;
//!
//! assert_eq!(result.title.as_deref(), Some("Bridges"));
//! assert_eq!(result.images.len(), 1);
//! assert_eq!(result.images[0].url, "https://example.com/golden-gate.jpg");
//! # Ok(())
//! # }
//! ```
//!
//! ## Guarantees
//!
//! - **Never fatal**: every failure degrades the result. A broken
//!   strategy, an unreachable resource, a cross-origin frame: all of it
//!   ends up as warnings, `None` sizes, or skipped contexts, never a
//!   crashed analysis. The only error `analyze_page` returns is an
//!   invalid configuration.
//! - **Deterministic**: the same DOM snapshot yields the same set of
//!   normalized image keys on every run.
//! - **Full inventory**: size filtering is a presentation concern;
//!   [`PageContentResult::images_above`] filters a view, the result
//!   always carries the complete set.

mod config;
mod error;
mod patterns;
mod pipeline;
mod result;

/// Consent-overlay detection and dismissal.
pub mod consent;

/// Title, headline, and body-text extraction.
pub mod content;

/// Multi-strategy image discovery across document contexts.
pub mod discover;

/// Lazy-load activation by scripted scrolling.
pub mod lazyload;

/// Image normalization, deduplication, and size enrichment.
pub mod normalize;

/// The rendered-page capability port.
pub mod page;

/// A `PageDriver` over static HTML.
pub mod snapshot;

/// URL resolution, comparison keys, and variant signatures.
pub mod url_utils;

/// Best-effort HTTP byte-size probe for driver implementations.
#[cfg(feature = "http-probe")]
pub mod probe;

// Public API - re-exports
pub use config::{AnalyzeConfig, ConsentRule, ScriptStatePattern};
pub use discover::ImageCandidate;
pub use error::{Error, Result};
pub use page::{ContextKind, ContextRef, DriverError, ElementRef, PageDriver, StyleMap};
pub use result::{
    AltQuality, ConsentOutcome, DiscoveryStrategy, Headline, NormalizedImage, PageContentResult,
};
pub use snapshot::StaticSnapshot;
#[cfg(feature = "http-probe")]
pub use probe::HttpSizeProbe;

// Callers cancelling a running analysis need the token type.
pub use tokio_util::sync::CancellationToken;

/// Analyze a rendered page with the given configuration.
///
/// Runs the full pipeline (consent resolution, lazy-load activation,
/// image discovery, normalization, content extraction) and returns one
/// aggregate record. Only an invalid configuration fails; everything
/// else degrades into the result itself.
///
/// # Example
///
/// ```rust
/// use pagesift::{analyze_page, AnalyzeConfig, StaticSnapshot};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let page = StaticSnapshot::from_html("<html><body><p>Hi</p></body></html>");
/// let config = AnalyzeConfig {
///     lazy_load_pause_ms: 0,
///     ..AnalyzeConfig::default()
/// };
/// let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
/// let result = rt.block_on(analyze_page(&page, &config))?;
/// assert!(result.images.is_empty());
/// # Ok(())
/// # }
/// ```
pub async fn analyze_page<D: PageDriver + ?Sized>(
    driver: &D,
    config: &AnalyzeConfig,
) -> Result<PageContentResult> {
    pipeline::run(driver, config, CancellationToken::new()).await
}

/// Analyze a rendered page with caller-controlled cancellation.
///
/// The token is honored between pipeline steps; a cancellation that
/// lands inside the normalization step abandons outstanding size
/// lookups (their records keep `byte_size: None`). The returned result
/// is marked [`PageContentResult::truncated`] and carries everything
/// collected up to the cancellation point.
pub async fn analyze_page_with_cancel<D: PageDriver + ?Sized>(
    driver: &D,
    config: &AnalyzeConfig,
    cancel: CancellationToken,
) -> Result<PageContentResult> {
    pipeline::run(driver, config, cancel).await
}

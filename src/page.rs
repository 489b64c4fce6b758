//! The rendered-page capability port.
//!
//! `PageDriver` is the seam between this crate and the rendering
//! collaborator (a WebDriver session, a CDP connection, or the built-in
//! [`StaticSnapshot`](crate::snapshot::StaticSnapshot)). The pipeline
//! only ever borrows a driver; owning and closing the underlying browser
//! is the caller's concern.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::url_utils;

/// Opaque handle for one document context: the main document, a shadow
/// root, or a nested document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextRef(pub u64);

impl ContextRef {
    /// The main document context.
    pub const MAIN: ContextRef = ContextRef(0);
}

/// What kind of document context a handle points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    /// The top-level document.
    Main,
    /// A shadow-encapsulated subtree.
    ShadowRoot,
    /// A same-origin nested document.
    NestedDocument,
}

/// Opaque handle for one element inside a document context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef {
    /// The context the element lives in.
    pub context: ContextRef,
    /// Driver-assigned element handle.
    pub handle: u64,
}

/// Computed style properties, keyed by lowercase property name.
pub type StyleMap = HashMap<String, String>;

/// Failures surfaced by a driver implementation.
///
/// The pipeline absorbs all of these: a failing call degrades the result
/// (a skipped element, a skipped strategy, a warning) instead of aborting
/// the analysis.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Script evaluation failed or is unsupported.
    #[error("script evaluation failed: {0}")]
    Script(String),

    /// The element handle no longer resolves.
    #[error("element is stale or detached: {0}")]
    StaleElement(String),

    /// The document context cannot be reached (typically cross-origin).
    #[error("document context not accessible: {0}")]
    ContextInaccessible(String),

    /// Any other backend failure.
    #[error("driver backend failure: {0}")]
    Backend(String),
}

/// Read access to a rendered page.
///
/// Implementations must be cheap to call repeatedly: the discovery pass
/// queries per context and reads attributes per element. `text_content`
/// follows rendered-visible-text semantics (WebDriver `.text`,
/// `innerText`): script and style text never appear in it.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// The page's base URL, used to resolve relative references.
    fn base_url(&self) -> Option<Url>;

    /// Resolve a possibly-relative URL against the page base.
    ///
    /// Returns `None` for opaque schemes (`data:`, `javascript:`) and
    /// for relative references when no base is known.
    fn resolve_url(&self, candidate: &str) -> Option<String> {
        url_utils::to_absolute(candidate, self.base_url().as_ref())
    }

    /// The declared document title.
    async fn page_title(&self) -> Result<Option<String>, DriverError>;

    /// All elements matching a CSS selector, in document order.
    async fn query_selector_all(
        &self,
        ctx: ContextRef,
        selector: &str,
    ) -> Result<Vec<ElementRef>, DriverError>;

    /// An attribute value, `None` when absent.
    async fn get_attribute(
        &self,
        el: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    /// The element's computed style.
    async fn computed_style(&self, el: &ElementRef) -> Result<StyleMap, DriverError>;

    /// Rendered-visible text of the element and its descendants.
    async fn text_content(&self, el: &ElementRef) -> Result<String, DriverError>;

    /// Lowercase tag name.
    async fn tag_name(&self, el: &ElementRef) -> Result<String, DriverError>;

    /// Shadow roots hosted directly inside a context.
    async fn enumerate_shadow_roots(
        &self,
        ctx: ContextRef,
    ) -> Result<Vec<ContextRef>, DriverError>;

    /// Accessible (same-origin) nested documents directly inside a
    /// context. Cross-origin documents are never returned.
    async fn enumerate_nested_documents(
        &self,
        ctx: ContextRef,
    ) -> Result<Vec<ContextRef>, DriverError>;

    /// Evaluate a read-only script in a context, returning its JSON value.
    async fn execute_script(&self, ctx: ContextRef, script: &str)
        -> Result<Value, DriverError>;

    /// Scroll the viewport to a vertical offset.
    async fn scroll_to(&self, y: f64) -> Result<(), DriverError>;

    /// Current scrollable document height.
    async fn document_height(&self) -> Result<f64, DriverError>;

    /// Click an element.
    async fn click(&self, el: &ElementRef) -> Result<(), DriverError>;

    /// Best-effort byte size of a resource. `None` means unknown; this
    /// call must never fail loudly.
    async fn fetch_resource_size(&self, url: &str) -> Option<u64>;
}

/// Best-effort visibility test over a computed style map.
///
/// Unknown properties count as visible; only an explicit `display: none`
/// or hidden/collapsed visibility hides an element.
pub(crate) fn is_visible(style: &StyleMap) -> bool {
    let displayed = style.get("display").is_none_or(|v| v.trim() != "none");
    let visible = style
        .get("visibility")
        .is_none_or(|v| v.trim() != "hidden" && v.trim() != "collapse");
    displayed && visible
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_defaults_to_visible() {
        assert!(is_visible(&StyleMap::new()));
    }

    #[test]
    fn display_none_hides() {
        let mut style = StyleMap::new();
        style.insert("display".to_string(), "none".to_string());
        assert!(!is_visible(&style));
    }

    #[test]
    fn visibility_hidden_hides() {
        let mut style = StyleMap::new();
        style.insert("visibility".to_string(), "hidden".to_string());
        assert!(!is_visible(&style));
    }

    #[test]
    fn main_context_is_context_zero() {
        assert_eq!(ContextRef::MAIN, ContextRef(0));
    }
}

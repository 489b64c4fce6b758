//! A `PageDriver` over static HTML.
//!
//! `StaticSnapshot` parses a fixed HTML document and answers driver
//! queries from it: declarative shadow roots (`<template shadowrootmode>`)
//! become shadow-root contexts, `<iframe srcdoc>` documents become nested
//! contexts, and inline `style` attributes stand in for computed style.
//! Script-exposed state cannot exist in static markup, so it is declared
//! on the snapshot instead ([`StaticSnapshot::with_script_state`]), as
//! are resource byte sizes. Scroll and click calls are recorded, which
//! makes the snapshot the natural test vehicle for the whole pipeline.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use dom_query::{Document, Selection};
use encoding_rs::{Encoding, UTF_8};
use serde_json::Value;
use tendril::StrTendril;
use url::Url;

use crate::page::{
    ContextKind, ContextRef, DriverError, ElementRef, PageDriver, StyleMap,
};
use crate::patterns::{CHARSET_META, SHADOW_TEMPLATE};

/// Attribute used to give every element a stable handle.
const ELEMENT_STAMP: &str = "data-pagesift-eid";

/// Upper bound on contexts materialized from one snapshot.
const MAX_BUILD_CONTEXTS: usize = 32;

const DEFAULT_DOCUMENT_HEIGHT: f64 = 2000.0;

struct SnapshotContext {
    markup: String,
    kind: ContextKind,
    parent: Option<usize>,
}

/// Static-HTML implementation of [`PageDriver`].
pub struct StaticSnapshot {
    contexts: Vec<SnapshotContext>,
    base: Option<Url>,
    script_state: HashMap<String, Value>,
    resource_sizes: HashMap<String, u64>,
    fail_scripts: bool,
    height: f64,
    scroll_log: Mutex<Vec<f64>>,
    click_log: Mutex<Vec<ElementRef>>,
}

impl StaticSnapshot {
    /// Build a snapshot from an HTML string.
    #[must_use]
    pub fn from_html(html: &str) -> Self {
        Self {
            contexts: build_contexts(html),
            base: None,
            script_state: HashMap::new(),
            resource_sizes: HashMap::new(),
            fail_scripts: false,
            height: DEFAULT_DOCUMENT_HEIGHT,
            scroll_log: Mutex::new(Vec::new()),
            click_log: Mutex::new(Vec::new()),
        }
    }

    /// Build a snapshot from raw bytes, sniffing the charset from the
    /// document's `<meta>` declaration (UTF-8 when absent). Undecodable
    /// bytes become replacement characters rather than errors.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(1024)]);
        let encoding = CHARSET_META
            .captures(&head)
            .and_then(|caps| Encoding::for_label(caps[1].as_bytes()))
            .unwrap_or(UTF_8);
        let (text, _, _) = encoding.decode(bytes);
        Self::from_html(&text)
    }

    /// Set the page base URL used for relative resolution.
    ///
    /// Unparseable input leaves the base unset.
    #[must_use]
    pub fn with_base_url(mut self, base: &str) -> Self {
        self.base = Url::parse(base).ok();
        self
    }

    /// Declare the byte size reported for one resource URL.
    #[must_use]
    pub fn with_resource_size(mut self, url: &str, bytes: u64) -> Self {
        self.resource_sizes.insert(url.to_string(), bytes);
        self
    }

    /// Declare script-exposed state for one global name.
    #[must_use]
    pub fn with_script_state(mut self, global: &str, value: Value) -> Self {
        self.script_state.insert(global.to_string(), value);
        self
    }

    /// Make every `execute_script` call fail.
    #[must_use]
    pub fn with_failing_scripts(mut self) -> Self {
        self.fail_scripts = true;
        self
    }

    /// Override the reported document height.
    #[must_use]
    pub fn with_document_height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    /// Scroll offsets received so far, in call order.
    #[must_use]
    pub fn scroll_positions(&self) -> Vec<f64> {
        self.scroll_log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Elements clicked so far, in call order.
    #[must_use]
    pub fn clicks(&self) -> Vec<ElementRef> {
        self.click_log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Number of document contexts in this snapshot.
    #[must_use]
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    fn context(&self, ctx: ContextRef) -> Result<&SnapshotContext, DriverError> {
        usize::try_from(ctx.0)
            .ok()
            .and_then(|idx| self.contexts.get(idx))
            .ok_or_else(|| {
                DriverError::ContextInaccessible(format!("unknown context {}", ctx.0))
            })
    }

    fn with_element<T>(
        &self,
        el: &ElementRef,
        read: impl FnOnce(&Selection) -> T,
    ) -> Result<T, DriverError> {
        let context = self.context(el.context)?;
        let doc = Document::from(context.markup.as_str());
        let sel = doc.select(&format!(r#"[{ELEMENT_STAMP}="{}"]"#, el.handle));
        if sel.is_empty() {
            return Err(DriverError::StaleElement(format!(
                "no element with handle {} in context {}",
                el.handle, el.context.0
            )));
        }
        Ok(read(&sel))
    }

    fn children_of(&self, ctx: ContextRef, kind: ContextKind) -> Result<Vec<ContextRef>, DriverError> {
        let parent = usize::try_from(ctx.0)
            .ok()
            .filter(|idx| *idx < self.contexts.len())
            .ok_or_else(|| {
                DriverError::ContextInaccessible(format!("unknown context {}", ctx.0))
            })?;
        Ok(self
            .contexts
            .iter()
            .enumerate()
            .filter(|(_, c)| c.parent == Some(parent) && c.kind == kind)
            .map(|(idx, _)| ContextRef(idx as u64))
            .collect())
    }
}

/// Materialize contexts breadth-first: the document itself, then shadow
/// fragments and `srcdoc` documents it hosts, then theirs.
fn build_contexts(html: &str) -> Vec<SnapshotContext> {
    let mut contexts: Vec<SnapshotContext> = Vec::new();
    let mut queue: VecDeque<(String, ContextKind, Option<usize>)> = VecDeque::new();
    queue.push_back((html.to_string(), ContextKind::Main, None));

    while let Some((raw, kind, parent)) = queue.pop_front() {
        if contexts.len() >= MAX_BUILD_CONTEXTS {
            break;
        }

        // Shadow content is encapsulated: lift it out of the host markup
        // so host-context queries cannot see it.
        let mut shadow_fragments: Vec<String> = Vec::new();
        let host_markup = SHADOW_TEMPLATE
            .replace_all(&raw, |caps: &regex::Captures| {
                shadow_fragments.push(caps[1].to_string());
                String::new()
            })
            .to_string();

        let doc = Document::from(host_markup);

        // Only srcdoc iframes are accessible; src-only iframes model
        // cross-origin documents and stay opaque.
        let nested: Vec<String> = doc
            .select("iframe[srcdoc]")
            .nodes()
            .iter()
            .filter_map(|node| Selection::from(*node).attr("srcdoc").map(|v| v.to_string()))
            .collect();

        for (handle, node) in doc.select("*").nodes().iter().enumerate() {
            Selection::from(*node).set_attr(ELEMENT_STAMP, &handle.to_string());
        }

        let markup: StrTendril = doc.html();
        let idx = contexts.len();
        contexts.push(SnapshotContext {
            markup: markup.to_string(),
            kind,
            parent,
        });

        for fragment in shadow_fragments {
            queue.push_back((fragment, ContextKind::ShadowRoot, Some(idx)));
        }
        for fragment in nested {
            queue.push_back((fragment, ContextKind::NestedDocument, Some(idx)));
        }
    }

    contexts
}

#[async_trait]
impl PageDriver for StaticSnapshot {
    fn base_url(&self) -> Option<Url> {
        self.base.clone()
    }

    async fn page_title(&self) -> Result<Option<String>, DriverError> {
        let context = self.context(ContextRef::MAIN)?;
        let doc = Document::from(context.markup.as_str());
        let title = doc.select("title");
        if title.is_empty() {
            return Ok(None);
        }
        let text = title.text().trim().to_string();
        Ok(if text.is_empty() { None } else { Some(text) })
    }

    async fn query_selector_all(
        &self,
        ctx: ContextRef,
        selector: &str,
    ) -> Result<Vec<ElementRef>, DriverError> {
        let context = self.context(ctx)?;
        let doc = Document::from(context.markup.as_str());
        let mut out = Vec::new();
        for node in doc.select(selector).nodes() {
            if let Some(stamp) = Selection::from(*node).attr(ELEMENT_STAMP) {
                if let Ok(handle) = stamp.parse::<u64>() {
                    out.push(ElementRef { context: ctx, handle });
                }
            }
        }
        // Handles are assigned in document order; selector lists must
        // come back in document order too.
        out.sort_by_key(|el| el.handle);
        Ok(out)
    }

    async fn get_attribute(
        &self,
        el: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        self.with_element(el, |sel| sel.attr(name).map(|v| v.to_string()))
    }

    async fn computed_style(&self, el: &ElementRef) -> Result<StyleMap, DriverError> {
        self.with_element(el, |sel| {
            let mut style = StyleMap::new();
            if let Some(raw) = sel.attr("style") {
                for declaration in raw.split(';') {
                    if let Some((property, value)) = declaration.split_once(':') {
                        let property = property.trim().to_ascii_lowercase();
                        if !property.is_empty() {
                            style.insert(property, value.trim().to_string());
                        }
                    }
                }
            }
            style
        })
    }

    async fn text_content(&self, el: &ElementRef) -> Result<String, DriverError> {
        let markup = self.with_element(el, |sel| sel.html().to_string())?;
        let fragment = Document::from(markup);
        fragment.select("script, style, noscript").remove();
        Ok(fragment.select("body").text().to_string())
    }

    async fn tag_name(&self, el: &ElementRef) -> Result<String, DriverError> {
        self.with_element(el, |sel| {
            sel.nodes()
                .first()
                .and_then(dom_query::NodeRef::node_name)
                .map(|name| name.to_ascii_lowercase())
        })?
        .ok_or_else(|| DriverError::StaleElement("element has no tag name".to_string()))
    }

    async fn enumerate_shadow_roots(
        &self,
        ctx: ContextRef,
    ) -> Result<Vec<ContextRef>, DriverError> {
        self.children_of(ctx, ContextKind::ShadowRoot)
    }

    async fn enumerate_nested_documents(
        &self,
        ctx: ContextRef,
    ) -> Result<Vec<ContextRef>, DriverError> {
        self.children_of(ctx, ContextKind::NestedDocument)
    }

    async fn execute_script(
        &self,
        ctx: ContextRef,
        script: &str,
    ) -> Result<Value, DriverError> {
        self.context(ctx)?;
        if self.fail_scripts {
            return Err(DriverError::Script(
                "script evaluation disabled for this snapshot".to_string(),
            ));
        }
        for (name, value) in &self.script_state {
            if script.contains(&format!("window[\"{name}\"]"))
                || script.contains(&format!("window.{name}"))
            {
                return Ok(value.clone());
            }
        }
        Ok(Value::Null)
    }

    async fn scroll_to(&self, y: f64) -> Result<(), DriverError> {
        if let Ok(mut log) = self.scroll_log.lock() {
            log.push(y);
        }
        Ok(())
    }

    async fn document_height(&self) -> Result<f64, DriverError> {
        Ok(self.height)
    }

    async fn click(&self, el: &ElementRef) -> Result<(), DriverError> {
        self.with_element(el, |_| ())?;
        if let Ok(mut log) = self.click_log.lock() {
            log.push(el.clone());
        }
        Ok(())
    }

    async fn fetch_resource_size(&self, url: &str) -> Option<u64> {
        self.resource_sizes.get(url).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAGE: &str = r#"
        <html>
          <head><title>  Fixture Page </title></head>
          <body>
            <img src="/a.jpg" alt="First">
            <div id="host"><template shadowrootmode="open"><img src="/shadow.jpg"></template></div>
            <iframe srcdoc="&lt;html&gt;&lt;body&gt;&lt;img src='/framed.jpg'&gt;&lt;/body&gt;&lt;/html&gt;"></iframe>
            <iframe src="https://other-origin.example/embed"></iframe>
          </body>
        </html>
    "#;

    #[tokio::test]
    async fn builds_shadow_and_nested_contexts() {
        let snapshot = StaticSnapshot::from_html(PAGE);
        assert_eq!(snapshot.context_count(), 3);

        let shadows = snapshot
            .enumerate_shadow_roots(ContextRef::MAIN)
            .await
            .unwrap_or_default();
        let nested = snapshot
            .enumerate_nested_documents(ContextRef::MAIN)
            .await
            .unwrap_or_default();
        assert_eq!(shadows.len(), 1);
        assert_eq!(nested.len(), 1);
    }

    #[tokio::test]
    async fn shadow_content_is_hidden_from_the_host_context() {
        let snapshot = StaticSnapshot::from_html(PAGE);

        let main_imgs = snapshot
            .query_selector_all(ContextRef::MAIN, "img")
            .await
            .unwrap_or_default();
        assert_eq!(main_imgs.len(), 1);

        let shadows = snapshot
            .enumerate_shadow_roots(ContextRef::MAIN)
            .await
            .unwrap_or_default();
        let shadow_imgs = snapshot
            .query_selector_all(shadows[0], "img")
            .await
            .unwrap_or_default();
        assert_eq!(shadow_imgs.len(), 1);

        let src = snapshot
            .get_attribute(&shadow_imgs[0], "src")
            .await
            .unwrap_or_default();
        assert_eq!(src.as_deref(), Some("/shadow.jpg"));
    }

    #[tokio::test]
    async fn nested_document_content_is_queryable() {
        let snapshot = StaticSnapshot::from_html(PAGE);
        let nested = snapshot
            .enumerate_nested_documents(ContextRef::MAIN)
            .await
            .unwrap_or_default();
        let imgs = snapshot
            .query_selector_all(nested[0], "img")
            .await
            .unwrap_or_default();
        assert_eq!(imgs.len(), 1);
        let src = snapshot
            .get_attribute(&imgs[0], "src")
            .await
            .unwrap_or_default();
        assert_eq!(src.as_deref(), Some("/framed.jpg"));
    }

    #[tokio::test]
    async fn title_is_trimmed() {
        let snapshot = StaticSnapshot::from_html(PAGE);
        let title = snapshot.page_title().await.unwrap_or_default();
        assert_eq!(title.as_deref(), Some("Fixture Page"));
    }

    #[tokio::test]
    async fn computed_style_parses_inline_declarations() {
        let snapshot = StaticSnapshot::from_html(
            r#"<html><body><div style="Display : none; background-image: url(/bg.png)"></div></body></html>"#,
        );
        let divs = snapshot
            .query_selector_all(ContextRef::MAIN, "div")
            .await
            .unwrap_or_default();
        let style = snapshot.computed_style(&divs[0]).await.unwrap_or_default();
        assert_eq!(style.get("display").map(String::as_str), Some("none"));
        assert_eq!(
            style.get("background-image").map(String::as_str),
            Some("url(/bg.png)")
        );
    }

    #[tokio::test]
    async fn text_content_excludes_script_and_style() {
        let snapshot = StaticSnapshot::from_html(
            "<html><body><main>Hello <script>var x = 1;</script>world<style>p{}</style></main></body></html>",
        );
        let mains = snapshot
            .query_selector_all(ContextRef::MAIN, "main")
            .await
            .unwrap_or_default();
        let text = snapshot.text_content(&mains[0]).await.unwrap_or_default();
        assert!(text.contains("Hello"));
        assert!(text.contains("world"));
        assert!(!text.contains("var x"));
        assert!(!text.contains("p{}"));
    }

    #[tokio::test]
    async fn declared_script_state_answers_matching_probes() {
        let snapshot = StaticSnapshot::from_html("<html><body></body></html>")
            .with_script_state("gallery", json!(["/g1.jpg", "/g2.jpg"]));

        let hit = snapshot
            .execute_script(ContextRef::MAIN, r#"walk(window["gallery"], 0, out)"#)
            .await
            .unwrap_or(Value::Null);
        assert_eq!(hit, json!(["/g1.jpg", "/g2.jpg"]));

        let miss = snapshot
            .execute_script(ContextRef::MAIN, r#"walk(window["photos"], 0, out)"#)
            .await
            .unwrap_or(Value::Null);
        assert_eq!(miss, Value::Null);
    }

    #[tokio::test]
    async fn failing_scripts_mode_errors() {
        let snapshot = StaticSnapshot::from_html("<html></html>").with_failing_scripts();
        let result = snapshot.execute_script(ContextRef::MAIN, "1").await;
        assert!(matches!(result, Err(DriverError::Script(_))));
    }

    #[tokio::test]
    async fn from_bytes_sniffs_meta_charset() {
        let bytes =
            b"<html><head><meta charset=\"ISO-8859-1\"></head><body><h1>Caf\xe9</h1></body></html>";
        let snapshot = StaticSnapshot::from_bytes(bytes);
        let h1s = snapshot
            .query_selector_all(ContextRef::MAIN, "h1")
            .await
            .unwrap_or_default();
        let text = snapshot.text_content(&h1s[0]).await.unwrap_or_default();
        assert_eq!(text.trim(), "Caf\u{e9}");
    }

    #[tokio::test]
    async fn unknown_resource_sizes_are_none() {
        let snapshot = StaticSnapshot::from_html("<html></html>")
            .with_resource_size("https://example.com/a.jpg", 12_345);
        assert_eq!(
            snapshot.fetch_resource_size("https://example.com/a.jpg").await,
            Some(12_345)
        );
        assert_eq!(
            snapshot.fetch_resource_size("https://example.com/b.jpg").await,
            None
        );
    }

    #[tokio::test]
    async fn stale_handles_are_reported() {
        let snapshot = StaticSnapshot::from_html("<html><body></body></html>");
        let bogus = ElementRef { context: ContextRef::MAIN, handle: 9999 };
        assert!(matches!(
            snapshot.get_attribute(&bogus, "src").await,
            Err(DriverError::StaleElement(_))
        ));
        assert!(matches!(
            snapshot.query_selector_all(ContextRef(42), "img").await,
            Err(DriverError::ContextInaccessible(_))
        ));
    }
}

//! Title, headline, and body-text extraction.
//!
//! Deliberately simple next to image discovery: the declared title with
//! an `h1` fallback, document-order headings for levels 1-3, and the
//! visible text of the main content region with whitespace collapsed.

use tracing::debug;

use crate::page::{ContextRef, PageDriver};
use crate::patterns::collapse_whitespace;
use crate::result::Headline;

/// Selectors tried in order for the main content region.
const CONTENT_REGION_SELECTORS: &[&str] =
    &["main", "article", r#"[role="main"]"#, "#content", "#main", "body"];

/// Output of the content extraction pass.
#[derive(Debug, Default)]
pub struct ContentOutcome {
    /// Declared title, falling back to the first `h1`.
    pub title: Option<String>,
    /// Document-order headings, levels 1-3, empty ones excluded.
    pub headlines: Vec<Headline>,
    /// Collapsed visible text of the main content region.
    pub text_content: String,
    /// Non-fatal issues encountered.
    pub warnings: Vec<String>,
}

/// Extract title, headlines, and body text from the main document.
///
/// Never fails; missing pieces stay empty.
pub async fn extract_content<D: PageDriver + ?Sized>(driver: &D) -> ContentOutcome {
    let mut outcome = ContentOutcome::default();

    match driver.page_title().await {
        Ok(title) => {
            outcome.title = title.map(|t| collapse_whitespace(&t)).filter(|t| !t.is_empty());
        }
        Err(err) => outcome
            .warnings
            .push(format!("page title unavailable: {err}")),
    }

    match driver.query_selector_all(ContextRef::MAIN, "h1, h2, h3").await {
        Ok(elements) => {
            for el in elements {
                let Ok(tag) = driver.tag_name(&el).await else {
                    continue;
                };
                let level = match tag.as_str() {
                    "h1" => 1,
                    "h2" => 2,
                    "h3" => 3,
                    _ => continue,
                };
                let Ok(text) = driver.text_content(&el).await else {
                    continue;
                };
                let text = collapse_whitespace(&text);
                if text.is_empty() {
                    continue;
                }
                outcome.headlines.push(Headline { level, text });
            }
        }
        Err(err) => outcome
            .warnings
            .push(format!("headline query failed: {err}")),
    }

    if outcome.title.is_none() {
        outcome.title = outcome
            .headlines
            .iter()
            .find(|h| h.level == 1)
            .map(|h| h.text.clone());
    }

    for selector in CONTENT_REGION_SELECTORS {
        let elements = match driver.query_selector_all(ContextRef::MAIN, selector).await {
            Ok(elements) => elements,
            Err(_) => continue,
        };
        let Some(region) = elements.first() else {
            continue;
        };
        match driver.text_content(region).await {
            Ok(text) => {
                outcome.text_content = collapse_whitespace(&text);
                debug!(region = selector, chars = outcome.text_content.len(), "content region read");
                break;
            }
            Err(_) => continue,
        }
    }

    outcome
}

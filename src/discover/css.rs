//! CSS background-image strategy.

use crate::page::{DriverError, PageDriver};
use crate::patterns;
use crate::result::DiscoveryStrategy;

use super::{DocumentContext, ImageCandidate};

/// Scan every element's computed `background-image` for `url(...)`
/// references. Data-URIs are skipped.
pub(crate) async fn scan<D: PageDriver + ?Sized>(
    driver: &D,
    context: &DocumentContext,
) -> Result<Vec<ImageCandidate>, DriverError> {
    let mut out = Vec::new();

    for el in driver.query_selector_all(context.ctx, "*").await? {
        let Ok(style) = driver.computed_style(&el).await else {
            continue;
        };
        let Some(value) = style
            .get("background-image")
            .or_else(|| style.get("background"))
        else {
            continue;
        };
        if !value.contains("url(") {
            continue;
        }

        let references: Vec<String> = patterns::css_urls(value)
            .into_iter()
            .filter(|u| !u.starts_with("data:"))
            .collect();
        if references.is_empty() {
            continue;
        }

        // Backgrounds rarely carry alt text; aria-label and title are
        // the best labelling we can get.
        let title = driver.get_attribute(&el, "title").await.ok().flatten();
        let aria_label = driver.get_attribute(&el, "aria-label").await.ok().flatten();

        for url in references {
            out.push(ImageCandidate {
                source_url: url,
                alt_text: None,
                title: title.clone(),
                aria_label: aria_label.clone(),
                strategy: DiscoveryStrategy::CssBackground,
                origin: context.ctx,
                origin_kind: context.kind,
                declared_width: None,
                declared_height: None,
            });
        }
    }

    Ok(out)
}

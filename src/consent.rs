//! Consent-overlay detection and dismissal.
//!
//! Cookie and GDPR overlays block content from ever reaching the DOM, so
//! they are dealt with before anything else. Detection is a one-shot,
//! best-effort scan: an ordered rule table of framework selectors and
//! locale-tagged accept phrases, checked across every accessible document
//! context. No retries; absence of a banner is a normal outcome.

use tracing::{debug, warn};

use crate::config::{AnalyzeConfig, ConsentRule};
use crate::discover::collect_contexts;
use crate::page::{is_visible, ElementRef, PageDriver};
use crate::result::ConsentOutcome;

/// Interactive elements worth checking for accept phrases.
const INTERACTIVE_SELECTOR: &str =
    r#"button, a, [role="button"], input[type="button"], input[type="submit"]"#;

/// Cap on interactive elements examined per context.
const MAX_SCANNED_ELEMENTS: usize = 200;

struct InteractiveElement {
    el: ElementRef,
    haystack: String,
}

/// Scan for a consent overlay and click its accept control.
///
/// Returns the outcome; never fails. The caller is responsible for a
/// settle delay after a successful dismissal, so the overlay can animate
/// out and layout can reflow before extraction continues.
pub async fn resolve<D: PageDriver + ?Sized>(
    driver: &D,
    config: &AnalyzeConfig,
) -> ConsentOutcome {
    let contexts = collect_contexts(driver, config).await;

    for context in &contexts {
        let mut interactive: Option<Vec<InteractiveElement>> = None;

        for rule in &config.consent_rules {
            // Structural selectors identify framework accept buttons
            // without any text matching.
            for selector in &rule.selectors {
                let elements = match driver.query_selector_all(context.ctx, selector).await {
                    Ok(elements) => elements,
                    Err(err) => {
                        debug!(%selector, %err, "consent selector query failed");
                        continue;
                    }
                };
                for el in elements {
                    if !element_visible(driver, &el).await {
                        continue;
                    }
                    return click_outcome(driver, &el, selector, &rule.locale).await;
                }
            }

            if rule.phrases.is_empty() {
                continue;
            }

            // Interactive elements are gathered once per context and
            // reused across the phrase rules.
            if interactive.is_none() {
                interactive = Some(gather_interactive(driver, context.ctx).await);
            }
            if let Some(elements) = interactive.as_ref() {
                for entry in elements {
                    let Some(phrase) = rule
                        .phrases
                        .iter()
                        .find(|phrase| entry.haystack.contains(phrase.as_str()))
                    else {
                        continue;
                    };
                    if !element_visible(driver, &entry.el).await {
                        continue;
                    }
                    return click_outcome(driver, &entry.el, phrase, &rule.locale).await;
                }
            }
        }
    }

    ConsentOutcome::default()
}

async fn gather_interactive<D: PageDriver + ?Sized>(
    driver: &D,
    ctx: crate::page::ContextRef,
) -> Vec<InteractiveElement> {
    let elements = match driver.query_selector_all(ctx, INTERACTIVE_SELECTOR).await {
        Ok(elements) => elements,
        Err(err) => {
            debug!(%err, "interactive element query failed");
            return Vec::new();
        }
    };

    let mut out = Vec::new();
    for el in elements.into_iter().take(MAX_SCANNED_ELEMENTS) {
        let mut haystack = String::new();
        if let Ok(text) = driver.text_content(&el).await {
            haystack.push_str(&text);
        }
        for attr in ["aria-label", "title", "value"] {
            if let Ok(Some(value)) = driver.get_attribute(&el, attr).await {
                haystack.push(' ');
                haystack.push_str(&value);
            }
        }
        out.push(InteractiveElement {
            el,
            haystack: haystack.to_lowercase(),
        });
    }
    out
}

async fn element_visible<D: PageDriver + ?Sized>(driver: &D, el: &ElementRef) -> bool {
    match driver.computed_style(el).await {
        Ok(style) => is_visible(&style),
        Err(_) => false,
    }
}

async fn click_outcome<D: PageDriver + ?Sized>(
    driver: &D,
    el: &ElementRef,
    pattern: &str,
    locale: &str,
) -> ConsentOutcome {
    match driver.click(el).await {
        Ok(()) => {
            debug!(%pattern, %locale, "consent overlay dismissed");
            ConsentOutcome {
                detected: true,
                dismissed: true,
                matched_pattern: Some(pattern.to_string()),
            }
        }
        Err(err) => {
            warn!(%pattern, %err, "consent accept click failed");
            ConsentOutcome {
                detected: true,
                dismissed: false,
                matched_pattern: Some(pattern.to_string()),
            }
        }
    }
}

//! Image discovery across document contexts.
//!
//! Runs a fixed, ordered set of extraction strategies over every
//! accessible document context and yields raw candidates. Strategies are
//! isolated: one failing must not abort the others. Given the same DOM
//! snapshot, the output is deterministic.

pub(crate) mod css;
pub(crate) mod markup;
pub(crate) mod script_state;

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::AnalyzeConfig;
use crate::page::{ContextKind, ContextRef, PageDriver};
use crate::result::DiscoveryStrategy;

/// One raw discovery hit. Produced by exactly one strategy invocation
/// and immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    /// Source URL as found on the page, possibly relative.
    pub source_url: String,
    /// Alt text, when the element carried one.
    pub alt_text: Option<String>,
    /// Title attribute.
    pub title: Option<String>,
    /// Aria label, used as an alt fallback downstream.
    pub aria_label: Option<String>,
    /// The strategy that produced this candidate.
    pub strategy: DiscoveryStrategy,
    /// Which document context the candidate was found in.
    pub origin: ContextRef,
    /// The kind of that context.
    pub origin_kind: ContextKind,
    /// Declared width attribute, when numeric.
    pub declared_width: Option<u32>,
    /// Declared height attribute, when numeric.
    pub declared_height: Option<u32>,
}

/// A document context scheduled for scanning.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DocumentContext {
    pub ctx: ContextRef,
    pub kind: ContextKind,
    pub depth: usize,
}

/// Enumerate all accessible document contexts, breadth-first.
///
/// Bounded by `max_context_depth` and `max_contexts`, with a visited set
/// for cycle protection. Enumeration failures are logged and skipped;
/// cross-origin nested documents never show up here by driver contract.
pub(crate) async fn collect_contexts<D: PageDriver + ?Sized>(
    driver: &D,
    config: &AnalyzeConfig,
) -> Vec<DocumentContext> {
    let mut contexts = vec![DocumentContext {
        ctx: ContextRef::MAIN,
        kind: ContextKind::Main,
        depth: 0,
    }];
    let mut visited: HashSet<ContextRef> = HashSet::from([ContextRef::MAIN]);
    let mut cursor = 0;

    while cursor < contexts.len() {
        let current = contexts[cursor];
        cursor += 1;

        if current.depth >= config.max_context_depth {
            continue;
        }

        match driver.enumerate_shadow_roots(current.ctx).await {
            Ok(roots) => {
                for root in roots {
                    if contexts.len() >= config.max_contexts {
                        break;
                    }
                    if visited.insert(root) {
                        contexts.push(DocumentContext {
                            ctx: root,
                            kind: ContextKind::ShadowRoot,
                            depth: current.depth + 1,
                        });
                    }
                }
            }
            Err(err) => debug!(context = current.ctx.0, %err, "shadow root enumeration failed"),
        }

        match driver.enumerate_nested_documents(current.ctx).await {
            Ok(documents) => {
                for doc in documents {
                    if contexts.len() >= config.max_contexts {
                        break;
                    }
                    if visited.insert(doc) {
                        contexts.push(DocumentContext {
                            ctx: doc,
                            kind: ContextKind::NestedDocument,
                            depth: current.depth + 1,
                        });
                    }
                }
            }
            Err(err) => {
                debug!(context = current.ctx.0, %err, "nested document enumeration failed");
            }
        }

        if contexts.len() >= config.max_contexts {
            break;
        }
    }

    contexts
}

/// Run every strategy over every accessible context.
///
/// Returns the union of all candidates plus warnings for strategies that
/// failed. Never fails as a whole.
pub async fn discover<D: PageDriver + ?Sized>(
    driver: &D,
    config: &AnalyzeConfig,
) -> (Vec<ImageCandidate>, Vec<String>) {
    let mut candidates = Vec::new();
    let mut warnings = Vec::new();

    let contexts = collect_contexts(driver, config).await;
    debug!(contexts = contexts.len(), "scanning document contexts");

    for context in &contexts {
        match markup::scan(driver, config, context).await {
            Ok(mut found) => candidates.append(&mut found),
            Err(err) => {
                warn!(context = context.ctx.0, %err, "markup strategy failed");
                warnings.push(format!(
                    "markup strategy failed in {:?} context: {err}",
                    context.kind
                ));
            }
        }

        match css::scan(driver, context).await {
            Ok(mut found) => candidates.append(&mut found),
            Err(err) => {
                warn!(context = context.ctx.0, %err, "css background strategy failed");
                warnings.push(format!(
                    "css background strategy failed in {:?} context: {err}",
                    context.kind
                ));
            }
        }

        // Script state needs a window object; shadow roots have none.
        if matches!(context.kind, ContextKind::Main | ContextKind::NestedDocument) {
            match script_state::scan(driver, config, context).await {
                Ok(mut found) => candidates.append(&mut found),
                Err(err) => {
                    warn!(context = context.ctx.0, %err, "script state strategy failed");
                    warnings.push(format!(
                        "script state strategy failed in {:?} context: {err}",
                        context.kind
                    ));
                }
            }
        }
    }

    debug!(candidates = candidates.len(), "discovery finished");
    (candidates, warnings)
}

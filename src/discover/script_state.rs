//! Script-exposed state strategy.
//!
//! Gallery and slider libraries habitually park image URL arrays in
//! well-known globals. Each configured pattern probes one global with a
//! read-only, depth-limited harvest script; whatever JSON comes back is
//! walked for strings that look like image URLs.

use serde_json::Value;
use tracing::trace;

use crate::config::AnalyzeConfig;
use crate::page::{DriverError, PageDriver};
use crate::patterns::{IMAGE_URL, SCRIPT_STATE_KEY};
use crate::result::DiscoveryStrategy;

use super::{DocumentContext, ImageCandidate};

const MAX_HARVEST_DEPTH: usize = 4;
const MAX_HARVEST_STRINGS: usize = 200;

/// Walk a JSON value collecting string leaves.
///
/// Objects are only descended through keys that plausibly hold image
/// data; arrays are walked fully. Depth and total count are capped.
fn harvest_strings(value: &Value, depth: usize, out: &mut Vec<String>) {
    if depth > MAX_HARVEST_DEPTH || out.len() >= MAX_HARVEST_STRINGS {
        return;
    }
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                harvest_strings(item, depth + 1, out);
            }
        }
        Value::Object(map) => {
            for (key, nested) in map {
                if SCRIPT_STATE_KEY.is_match(key) {
                    harvest_strings(nested, depth + 1, out);
                }
            }
        }
        _ => {}
    }
}

/// Probe every configured pattern in order and harvest image URLs.
pub(crate) async fn scan<D: PageDriver + ?Sized>(
    driver: &D,
    config: &AnalyzeConfig,
    context: &DocumentContext,
) -> Result<Vec<ImageCandidate>, DriverError> {
    let mut out = Vec::new();

    for pattern in &config.script_state_patterns {
        let value = driver.execute_script(context.ctx, &pattern.probe).await?;
        if value.is_null() {
            continue;
        }

        let mut strings = Vec::new();
        harvest_strings(&value, 0, &mut strings);
        let before = out.len();

        for s in strings {
            let s = s.trim();
            if IMAGE_URL.is_match(s) {
                out.push(ImageCandidate {
                    source_url: s.to_string(),
                    alt_text: None,
                    title: None,
                    aria_label: None,
                    strategy: DiscoveryStrategy::ScriptState,
                    origin: context.ctx,
                    origin_kind: context.kind,
                    declared_width: None,
                    declared_height: None,
                });
            }
        }

        if out.len() > before {
            trace!(pattern = %pattern.name, found = out.len() - before, "script state hit");
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn harvest_walks_arrays_and_image_keys() {
        let value = json!({
            "images": ["/a.jpg", {"src": "/b.png"}],
            "unrelated": ["/c.gif"],
            "count": 3,
        });
        let mut out = Vec::new();
        harvest_strings(&value, 0, &mut out);
        assert!(out.contains(&"/a.jpg".to_string()));
        assert!(out.contains(&"/b.png".to_string()));
        assert!(!out.contains(&"/c.gif".to_string()));
    }

    #[test]
    fn harvest_respects_depth_cap() {
        let deep = json!({"src": {"src": {"src": {"src": {"src": {"src": "/deep.jpg"}}}}}});
        let mut out = Vec::new();
        harvest_strings(&deep, 0, &mut out);
        assert!(out.is_empty());
    }
}

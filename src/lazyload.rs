//! Lazy-load activation by scripted scrolling.
//!
//! Deferred content materializes when the viewport approaches it. The
//! activator descends the page in fixed increments, re-measuring the
//! document height after each step because loaded content grows it, then
//! returns to the top, since many sites anchor hero images relative to the
//! initial viewport. Safe to call more than once.

use std::time::Duration;

use tracing::debug;

use crate::config::AnalyzeConfig;
use crate::page::{ContextRef, PageDriver};

/// Nudge listeners that key off scroll events rather than position.
const NUDGE_SCRIPT: &str = r"(function() {
  window.dispatchEvent(new Event('scroll'));
  document.dispatchEvent(new Event('scroll'));
  return null;
})()";

/// Run the scroll sequence. Side-effect only; driver failures end the
/// pass early but are never surfaced.
pub async fn activate<D: PageDriver + ?Sized>(driver: &D, config: &AnalyzeConfig) {
    if config.lazy_load_scroll_steps == 0 {
        return;
    }

    let pause = Duration::from_millis(config.lazy_load_pause_ms);
    let mut height = driver.document_height().await.unwrap_or(0.0);
    let mut position = 0.0;

    for step in 0..config.lazy_load_scroll_steps {
        position += config.lazy_load_scroll_distance;
        if driver.scroll_to(position).await.is_err() {
            debug!(step, "scroll failed, ending lazy-load pass");
            return;
        }
        tokio::time::sleep(pause).await;

        height = driver.document_height().await.unwrap_or(height);
        if position >= height {
            break;
        }
    }

    let _ = driver.execute_script(ContextRef::MAIN, NUDGE_SCRIPT).await;
    let _ = driver.scroll_to(0.0).await;
    tokio::time::sleep(pause).await;
}

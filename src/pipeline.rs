//! The analysis pipeline.
//!
//! Steps run strictly in sequence: consent resolution mutates the DOM
//! that lazy loading scrolls, which mutates the DOM that discovery
//! reads, so nothing here is reorderable. Cancellation is honored between
//! steps; inside the normalization step it only abandons outstanding
//! size lookups.

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::AnalyzeConfig;
use crate::error::Result;
use crate::page::PageDriver;
use crate::result::{ConsentOutcome, PageContentResult};
use crate::{consent, content, discover, lazyload, normalize};

pub(crate) async fn run<D: PageDriver + ?Sized>(
    driver: &D,
    config: &AnalyzeConfig,
    cancel: CancellationToken,
) -> Result<PageContentResult> {
    config.validate()?;

    let mut result = PageContentResult {
        url: driver.base_url().map(|u| u.to_string()),
        title: None,
        headlines: Vec::new(),
        text_content: String::new(),
        images: Vec::new(),
        consent: ConsentOutcome::default(),
        truncated: false,
        warnings: Vec::new(),
        analyzed_at: Utc::now(),
    };

    result.consent = consent::resolve(driver, config).await;
    if result.consent.dismissed && config.consent_settle_ms > 0 {
        // The overlay needs to animate out and layout needs to reflow;
        // extracting too early misses images behind the banner.
        tokio::time::sleep(std::time::Duration::from_millis(config.consent_settle_ms)).await;
    }
    if cancelled(&cancel, &mut result, "consent resolution") {
        return Ok(result);
    }

    lazyload::activate(driver, config).await;
    if cancelled(&cancel, &mut result, "lazy-load activation") {
        return Ok(result);
    }

    let (candidates, mut discovery_warnings) = discover::discover(driver, config).await;
    result.warnings.append(&mut discovery_warnings);
    if cancelled(&cancel, &mut result, "image discovery") {
        return Ok(result);
    }

    // Outstanding size lookups are abandoned on every exit path.
    let pool_cancel = cancel.child_token();
    let _pool_guard = pool_cancel.clone().drop_guard();
    let mut normalized = normalize::normalize(candidates, driver, config, &pool_cancel).await;
    result.images = normalized.images;
    result.warnings.append(&mut normalized.warnings);
    result.truncated |= normalized.truncated;
    if cancelled(&cancel, &mut result, "image normalization") {
        return Ok(result);
    }

    let mut page_content = content::extract_content(driver).await;
    result.title = page_content.title;
    result.headlines = page_content.headlines;
    result.text_content = page_content.text_content;
    result.warnings.append(&mut page_content.warnings);

    debug!(
        images = result.images.len(),
        headlines = result.headlines.len(),
        truncated = result.truncated,
        "analysis finished"
    );
    Ok(result)
}

fn cancelled(
    cancel: &CancellationToken,
    result: &mut PageContentResult,
    after_step: &str,
) -> bool {
    if !cancel.is_cancelled() {
        return false;
    }
    result.truncated = true;
    result
        .warnings
        .push(format!("analysis cancelled after {after_step}"));
    true
}

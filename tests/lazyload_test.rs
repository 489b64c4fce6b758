use pagesift::lazyload::activate;
use pagesift::{AnalyzeConfig, StaticSnapshot};

fn config() -> AnalyzeConfig {
    AnalyzeConfig {
        lazy_load_scroll_steps: 8,
        lazy_load_scroll_distance: 600.0,
        lazy_load_pause_ms: 0,
        ..AnalyzeConfig::default()
    }
}

#[tokio::test]
async fn scrolls_down_in_increments_then_returns_to_top() {
    let page = StaticSnapshot::from_html("<html><body></body></html>").with_document_height(1500.0);

    activate(&page, &config()).await;

    let positions = page.scroll_positions();
    assert_eq!(positions, vec![600.0, 1200.0, 1800.0, 0.0]);
}

#[tokio::test]
async fn step_count_caps_the_descent() {
    let page =
        StaticSnapshot::from_html("<html><body></body></html>").with_document_height(100_000.0);

    let short = AnalyzeConfig {
        lazy_load_scroll_steps: 3,
        ..config()
    };
    activate(&page, &short).await;

    let positions = page.scroll_positions();
    // Three increments plus the final top scroll.
    assert_eq!(positions, vec![600.0, 1200.0, 1800.0, 0.0]);
}

#[tokio::test]
async fn zero_steps_disable_the_pass() {
    let page = StaticSnapshot::from_html("<html><body></body></html>");
    let disabled = AnalyzeConfig {
        lazy_load_scroll_steps: 0,
        ..config()
    };
    activate(&page, &disabled).await;
    assert!(page.scroll_positions().is_empty());
}

#[tokio::test]
async fn activation_is_idempotent() {
    let page = StaticSnapshot::from_html("<html><body></body></html>").with_document_height(700.0);

    activate(&page, &config()).await;
    let first = page.scroll_positions();
    activate(&page, &config()).await;
    let second = page.scroll_positions();

    assert_eq!(first.len() * 2, second.len());
    assert_eq!(&second[..first.len()], &first[..]);
}

use pagesift::{
    analyze_page, analyze_page_with_cancel, AltQuality, AnalyzeConfig, CancellationToken,
    StaticSnapshot,
};

fn fast_config() -> AnalyzeConfig {
    AnalyzeConfig {
        lazy_load_pause_ms: 0,
        consent_settle_ms: 0,
        ..AnalyzeConfig::default()
    }
}

/// Shadow-root image, CSS background, and a German consent banner.
const SCENARIO: &str = r#"
    <html>
      <head><title>Galerie</title></head>
      <body>
        <div id="cmp"><button>Alle akzeptieren</button></div>
        <div id="host"><template shadowrootmode="open"><img src="/a.jpg"></template></div>
        <section style="background-image: url('/bg.png')">Hero</section>
      </body>
    </html>
"#;

#[tokio::test]
async fn scenario_shadow_image_background_and_german_banner() {
    let page = StaticSnapshot::from_html(SCENARIO).with_base_url("https://example.de/");

    let result = match analyze_page(&page, &fast_config()).await {
        Ok(result) => result,
        Err(err) => panic!("expected Ok(_), got Err({err:?})"),
    };

    assert!(result.consent.detected);
    assert!(result.consent.dismissed);
    assert_eq!(result.consent.matched_pattern.as_deref(), Some("alle akzeptieren"));

    assert_eq!(result.images.len(), 2);
    let urls: Vec<&str> = result.images.iter().map(|i| i.url.as_str()).collect();
    assert!(urls.contains(&"https://example.de/a.jpg"));
    assert!(urls.contains(&"https://example.de/bg.png"));

    let shadow_img = result
        .images
        .iter()
        .find(|i| i.url.ends_with("/a.jpg"))
        .map_or_else(|| panic!("shadow image missing"), |img| img);
    assert_eq!(shadow_img.alt_quality, AltQuality::Missing);

    assert!(!result.truncated);
}

#[tokio::test]
async fn repeated_runs_yield_identical_key_sets() {
    let build = || {
        StaticSnapshot::from_html(SCENARIO)
            .with_base_url("https://example.de/")
            .with_script_state(
                "gallery",
                serde_json::json!(["/g1.jpg", "/g2.jpg", "ignored"]),
            )
    };

    let first = match analyze_page(&build(), &fast_config()).await {
        Ok(result) => result,
        Err(err) => panic!("expected Ok(_), got Err({err:?})"),
    };
    let second = match analyze_page(&build(), &fast_config()).await {
        Ok(result) => result,
        Err(err) => panic!("expected Ok(_), got Err({err:?})"),
    };

    let keys = |r: &pagesift::PageContentResult| {
        r.images
            .iter()
            .map(|i| i.comparison_key.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(keys(&first), keys(&second));
    assert_eq!(first.images.len(), 4);
}

#[tokio::test]
async fn min_size_filter_is_a_view_not_a_mutation() {
    let html = r#"
        <html><body>
          <img src="/big.jpg" alt="Big enough">
          <img src="/small.jpg" alt="Tiny tracking pixel">
          <img src="/unknown.jpg" alt="Size never resolved">
        </body></html>
    "#;
    let page = StaticSnapshot::from_html(html)
        .with_base_url("https://example.com/")
        .with_resource_size("https://example.com/big.jpg", 20_480)
        .with_resource_size("https://example.com/small.jpg", 4_096);

    let config = AnalyzeConfig {
        min_image_size_bytes: 10_240,
        ..fast_config()
    };
    let result = match analyze_page(&page, &config).await {
        Ok(result) => result,
        Err(err) => panic!("expected Ok(_), got Err({err:?})"),
    };

    // The core always returns the full inventory.
    assert_eq!(result.images.len(), 3);

    // The filtered view drops only the image known to be small.
    let filtered = result.images_above(config.min_image_size_bytes);
    let urls: Vec<&str> = filtered.iter().map(|i| i.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://example.com/big.jpg",
            "https://example.com/unknown.jpg"
        ]
    );
}

#[tokio::test]
async fn pre_cancelled_analysis_returns_truncated_partial_result() {
    let page = StaticSnapshot::from_html(SCENARIO).with_base_url("https://example.de/");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = match analyze_page_with_cancel(&page, &fast_config(), cancel).await {
        Ok(result) => result,
        Err(err) => panic!("expected Ok(_), got Err({err:?})"),
    };

    assert!(result.truncated);
    // Consent ran; discovery never did.
    assert!(result.consent.detected);
    assert!(result.images.is_empty());
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("cancelled")));
}

#[tokio::test]
async fn invalid_configuration_fails_fast() {
    let page = StaticSnapshot::from_html("<html></html>");
    let config = AnalyzeConfig {
        size_fetch_concurrency: 0,
        ..AnalyzeConfig::default()
    };
    assert!(matches!(
        analyze_page(&page, &config).await,
        Err(pagesift::Error::BadConfig(_))
    ));
}

#[tokio::test]
async fn result_carries_page_url_and_timestamp() {
    let page =
        StaticSnapshot::from_html("<html><body></body></html>").with_base_url("https://example.com/page");
    let result = match analyze_page(&page, &fast_config()).await {
        Ok(result) => result,
        Err(err) => panic!("expected Ok(_), got Err({err:?})"),
    };
    assert_eq!(result.url.as_deref(), Some("https://example.com/page"));
    assert!(result.analyzed_at <= chrono::Utc::now());
}

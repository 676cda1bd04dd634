use super::*;
use storefront_scraper::browser::BrowserEvent;
use storefront_scraper::{LatestSnapshot, PublishSink, SessionOutcome, SessionState};

fn sink() -> (LatestSnapshot, Arc<dyn PublishSink>) {
    let sink = LatestSnapshot::new();
    let writer: Arc<dyn PublishSink> = Arc::new(sink.clone());
    (sink, writer)
}

#[tokio::test]
async fn test_three_pages_of_five_items() -> anyhow::Result<()> {
    let config = get_test_config();
    let browser = MemoryBrowser::from_pages(catalog(3, 5));
    let session = create_session(browser.clone(), &config);
    let (reader, writer) = sink();

    assert!(session.start(SHOP_URL, None, writer)?);
    let status = session.wait_until_stopped().await;

    assert_eq!(status.state, SessionState::Stopped);
    assert_eq!(status.outcome, Some(SessionOutcome::Completed));
    assert_eq!(status.item_count, 15);
    assert_eq!(status.profile.as_deref(), Some("woocommerce"));

    let snapshot = reader.read_latest();
    assert_eq!(snapshot.len(), 15);
    assert_eq!(snapshot.items()[0].name(), "Product 0-0");
    assert_eq!(snapshot.items()[5].name(), "Product 1-0");
    assert_eq!(snapshot.items()[14].name(), "Product 2-4");
    assert_eq!(snapshot.items()[14].price_raw(), "304.00 EGP");

    let clicks = browser
        .events()
        .into_iter()
        .filter(|e| matches!(e, BrowserEvent::Click(_)))
        .count();
    assert_eq!(clicks, 2);
    assert_eq!(browser.events().last(), Some(&BrowserEvent::Close));
    Ok(())
}

#[tokio::test]
async fn test_every_field_has_a_value_or_sentinel() -> anyhow::Result<()> {
    let config = get_test_config();
    let page = r#"<ul>
        <li class="product"><h2><a href="/p/1">Full</a></h2><span class="price"><bdi>10 EGP</bdi></span><img src="/1.jpg"></li>
        <li class="product"><h3>Bare</h3></li>
    </ul>"#;
    let session = create_session(MemoryBrowser::from_pages([page]), &config);
    let (reader, writer) = sink();

    session.start(SHOP_URL, None, writer)?;
    session.wait_until_stopped().await;

    let snapshot = reader.read_latest();
    assert_eq!(snapshot.len(), 2);
    for item in &snapshot {
        for field in [item.name(), item.price_raw(), item.link(), item.image()] {
            assert!(!field.trim().is_empty());
        }
    }
    let bare = &snapshot.items()[1];
    assert_eq!(bare.name(), "Bare");
    assert_eq!(bare.price_raw(), "N/A");
    assert_eq!(bare.link(), "N/A");
    assert_eq!(bare.image(), "N/A");
    Ok(())
}

#[tokio::test]
async fn test_published_length_never_decreases() -> anyhow::Result<()> {
    let config = get_test_config();
    let session = create_session(MemoryBrowser::from_pages(catalog(4, 3)), &config);
    let (reader, writer) = sink();

    let mut rx = reader.subscribe();
    let collector = tokio::spawn(async move {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let len = rx.borrow_and_update().len();
            seen.push(len);
            if len == 12 {
                break;
            }
        }
        seen
    });

    session.start(SHOP_URL, None, writer)?;
    session.wait_until_stopped().await;

    let seen = tokio::time::timeout(Duration::from_secs(5), collector).await??;
    assert_eq!(seen.last(), Some(&12));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "lengths went down: {:?}", seen);
    Ok(())
}

#[tokio::test]
async fn test_retry_preserves_progress() -> anyhow::Result<()> {
    let config = get_test_config();
    let browser = MemoryBrowser::from_pages(catalog(3, 5));
    // Leaving page two times out once, after ten items were already published.
    browser.fail_clicks_on_page(1, 1);
    let session = create_session(browser.clone(), &config);
    let (reader, writer) = sink();

    let mut rx = reader.subscribe();
    let floor = tokio::spawn(async move {
        let mut max_seen = 0;
        while rx.changed().await.is_ok() {
            let len = rx.borrow_and_update().len();
            assert!(len >= max_seen, "result set shrank from {} to {}", max_seen, len);
            max_seen = len;
            if len == 15 {
                break;
            }
        }
        max_seen
    });

    session.start(SHOP_URL, None, writer)?;
    let status = session.wait_until_stopped().await;

    assert_eq!(status.outcome, Some(SessionOutcome::Completed));
    assert_eq!(status.attempts, 2);
    // Replayed pages are de-duplicated, so the catalog is counted once.
    assert_eq!(reader.len(), 15);
    assert_eq!(tokio::time::timeout(Duration::from_secs(5), floor).await??, 15);

    let navigations = browser
        .events()
        .into_iter()
        .filter(|e| matches!(e, BrowserEvent::Navigate(_)))
        .count();
    assert_eq!(navigations, 2);
    Ok(())
}

#[tokio::test]
async fn test_retry_budget_exhausted() -> anyhow::Result<()> {
    let config = get_test_config();
    let browser = MemoryBrowser::from_pages(catalog(1, 2));
    browser.fail_navigations(10);
    let session = create_session(browser, &config);
    let (reader, writer) = sink();

    session.start(SHOP_URL, None, writer)?;
    tokio::time::timeout(Duration::from_secs(5), session.wait_until_stopped()).await?;

    let status = session.status();
    assert_eq!(status.state, SessionState::Stopped);
    assert_eq!(status.attempts, 3);
    match status.outcome {
        Some(SessionOutcome::Failed { reason }) => assert!(reason.contains("ERR_CONNECTION_RESET")),
        other => panic!("expected a failed outcome, got {:?}", other),
    }
    assert!(reader.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_failed_is_visible_before_stopped() -> anyhow::Result<()> {
    let config = get_test_config();
    let browser = MemoryBrowser::from_pages(catalog(1, 2));
    browser.fail_navigations(10);
    let session = create_session(browser, &config);
    let (_reader, writer) = sink();

    let mut rx = session.subscribe();
    let watcher = tokio::spawn(async move {
        let mut states = Vec::new();
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().state;
            states.push(state);
            if state == SessionState::Stopped {
                break;
            }
        }
        states
    });

    session.start(SHOP_URL, None, writer)?;
    session.wait_until_stopped().await;

    let states = tokio::time::timeout(Duration::from_secs(5), watcher).await??;
    let failed = states.iter().position(|s| *s == SessionState::Failed);
    let stopped = states.iter().position(|s| *s == SessionState::Stopped);
    assert!(
        matches!((failed, stopped), (Some(f), Some(s)) if f < s),
        "states seen: {:?}",
        states
    );
    Ok(())
}

#[tokio::test]
async fn test_stop_during_retry_backoff() -> anyhow::Result<()> {
    let mut config = get_test_config();
    config.scraper.retry_delay_ms = 30_000;
    let browser = MemoryBrowser::from_pages(catalog(1, 2));
    browser.fail_navigations(10);
    let session = create_session(browser.clone(), &config);
    let (reader, writer) = sink();

    session.start(SHOP_URL, None, writer)?;
    // The first navigation fails, then the run waits out the retry delay.
    let navigated = || browser.events().iter().any(|e| matches!(e, BrowserEvent::Navigate(_)));
    assert!(wait_for_condition(navigated, Duration::from_secs(5)).await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let requested = std::time::Instant::now();
    session.stop();
    let status = tokio::time::timeout(Duration::from_secs(2), session.wait_until_stopped()).await?;

    assert!(requested.elapsed() < Duration::from_secs(2));
    assert_eq!(status.state, SessionState::Stopped);
    assert_eq!(status.outcome, Some(SessionOutcome::Cancelled));
    assert_eq!(status.attempts, 1);
    assert!(reader.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_start_while_running_is_ignored() -> anyhow::Result<()> {
    let mut config = get_test_config();
    config.scraper.settle_delay_ms = 2_000;
    let session = create_session(MemoryBrowser::from_pages(catalog(3, 2)), &config);
    let (_reader, writer) = sink();

    assert!(session.start(SHOP_URL, None, Arc::clone(&writer))?);
    let run_id = session.status().run_id;

    assert!(!session.start("https://other.example/store", None, writer)?);
    assert_eq!(session.status().run_id, run_id);
    assert_eq!(session.status().target_url.as_deref(), Some(SHOP_URL));

    session.stop();
    session.wait_until_stopped().await;
    Ok(())
}

#[tokio::test]
async fn test_stop_latency_is_bounded_by_one_settle() -> anyhow::Result<()> {
    let mut config = get_test_config();
    config.scraper.settle_delay_ms = 10_000;
    let session = create_session(MemoryBrowser::from_pages(catalog(5, 5)), &config);
    let (reader, writer) = sink();

    session.start(SHOP_URL, None, writer)?;
    assert!(wait_for_condition(|| reader.len() >= 5, Duration::from_secs(5)).await);
    assert!(session.state().is_active());

    let requested = std::time::Instant::now();
    session.stop();
    assert_eq!(session.state(), SessionState::Stopping);

    let status = tokio::time::timeout(Duration::from_secs(2), session.wait_until_stopped()).await?;
    assert!(requested.elapsed() < Duration::from_secs(2));
    assert_eq!(status.state, SessionState::Stopped);
    assert_eq!(status.outcome, Some(SessionOutcome::Cancelled));
    assert_eq!(reader.len(), 5);
    Ok(())
}

#[tokio::test]
async fn test_stop_is_idempotent() -> anyhow::Result<()> {
    let mut config = get_test_config();
    config.scraper.settle_delay_ms = 1_000;
    let session = create_session(MemoryBrowser::from_pages(catalog(3, 1)), &config);
    let (_reader, writer) = sink();

    session.start(SHOP_URL, None, writer)?;
    session.stop();
    session.stop();
    let first = session.wait_until_stopped().await;

    session.stop();
    let second = session.status();
    assert_eq!(second.state, SessionState::Stopped);
    assert_eq!(second.finished_at, first.finished_at);
    assert_eq!(second.outcome, Some(SessionOutcome::Cancelled));
    Ok(())
}

#[tokio::test]
async fn test_session_can_be_restarted() -> anyhow::Result<()> {
    let config = get_test_config();
    let session = create_session(MemoryBrowser::from_pages(catalog(2, 2)), &config);
    let (reader, writer) = sink();

    session.start(SHOP_URL, None, Arc::clone(&writer))?;
    let first = session.wait_until_stopped().await;
    assert_eq!(reader.len(), 4);

    assert!(session.start(SHOP_URL, None, writer)?);
    let second = session.wait_until_stopped().await;
    assert_ne!(first.run_id, second.run_id);
    // A new run starts from an empty result set rather than appending.
    assert_eq!(reader.len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_in_page_search_submits_keywords() -> anyhow::Result<()> {
    let config = get_test_config();
    let browser = MemoryBrowser::from_pages(catalog(1, 2));
    let session = create_session(browser.clone(), &config);
    let (reader, writer) = sink();

    session.start(SHOP_URL, Some("  phone case "), writer)?;
    session.wait_until_stopped().await;

    assert!(browser.events().contains(&BrowserEvent::Search {
        selector: r#"input[name="s"][type="search"]"#.to_string(),
        text: "phone case".to_string(),
    }));
    assert_eq!(reader.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_missing_search_input_scrapes_landing_page() -> anyhow::Result<()> {
    let config = get_test_config();
    let page = r#"<ul><li class="product"><h2><a href="/p/1">Lamp</a></h2></li></ul>"#;
    let browser = MemoryBrowser::from_pages([page]);
    let session = create_session(browser.clone(), &config);
    let (reader, writer) = sink();

    session.start(SHOP_URL, Some("lamp"), writer)?;
    let status = session.wait_until_stopped().await;

    assert_eq!(status.outcome, Some(SessionOutcome::Completed));
    assert!(!browser.events().iter().any(|e| matches!(e, BrowserEvent::Search { .. })));
    assert_eq!(reader.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_direct_search_url_for_noon() -> anyhow::Result<()> {
    let config = get_test_config();
    let page = r#"<div data-qa="product-box"><a href="/egypt-en/p/1"><span data-qa="product-name">iPhone 15</span></a><strong class="Price_amount__2sXa7">45,999</strong></div>"#;
    let browser = MemoryBrowser::from_pages([page]);
    let session = create_session(browser.clone(), &config);
    let (reader, writer) = sink();

    session.start("https://www.noon.com/egypt-en/", Some("iphone 15"), writer)?;
    let status = session.wait_until_stopped().await;

    assert_eq!(status.profile.as_deref(), Some("noon"));
    assert!(browser.events().contains(&BrowserEvent::Navigate(
        "https://www.noon.com/egypt-en/search?q=iphone+15".to_string()
    )));
    let latest = reader.read_latest();
    let item = &latest.items()[0];
    assert_eq!(item.link(), "https://www.noon.com/egypt-en/p/1");
    assert_eq!(item.price_raw(), "45,999");
    Ok(())
}

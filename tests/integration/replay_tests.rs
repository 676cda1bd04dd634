use super::*;
use storefront_scraper::{export, LatestSnapshot, PriceSummary, SessionOutcome};

#[tokio::test]
async fn test_replay_saved_pages_to_csv() -> anyhow::Result<()> {
    let pages_dir = tempfile::tempdir()?;
    for (i, page) in catalog(3, 4).iter().enumerate() {
        std::fs::write(pages_dir.path().join(format!("page-{:02}.html", i + 1)), page)?;
    }

    let browser = MemoryBrowser::from_dir(pages_dir.path())?;
    let session = create_session(browser, &get_test_config());
    let sink = LatestSnapshot::new();

    session.start(SHOP_URL, None, Arc::new(sink.clone()))?;
    let status = session.wait_until_stopped().await;
    assert_eq!(status.outcome, Some(SessionOutcome::Completed));

    let out_dir = tempfile::tempdir()?;
    let output = out_dir.path().join(export::CSV_FILE_NAME);
    let snapshot = sink.read_latest();
    export::write_csv_file(&snapshot, &output)?;

    let mut reader = csv::Reader::from_path(&output)?;
    let names: Vec<String> = reader
        .records()
        .map(|r| r.map(|r| r[0].to_string()))
        .collect::<Result<_, _>>()?;
    assert_eq!(names.len(), 12);
    assert_eq!(names[0], "Product 0-0");
    assert_eq!(names[11], "Product 2-3");

    let summary = PriceSummary::from_items(&snapshot).expect("catalog has prices");
    assert_eq!(summary.count, 12);
    assert_eq!(summary.lowest.to_string(), "100.00");
    assert_eq!(summary.highest.to_string(), "303.00");
    Ok(())
}

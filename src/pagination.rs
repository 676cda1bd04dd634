//! One page of the scraping loop: find containers, extract them, find the
//! way to the next page.

use scraper::{ElementRef, Html};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::browser::BrowserPage;
use crate::extract::extract;
use crate::models::ScrapedItem;
use crate::profiles::SiteProfile;
use crate::utils::error::Result;

#[derive(Debug, Clone, Copy)]
pub struct PageOptions {
    pub settle_delay: Duration,
    pub empty_page_retries: u32,
}

#[derive(Debug, Clone, Default)]
pub struct PageOutcome {
    /// Extracted items in DOM order.
    pub items: Vec<ScrapedItem>,
    /// Selector of the live next-page control, if there is one.
    pub next_page: Option<String>,
    /// Cancellation cut extraction short.
    pub interrupted: bool,
}

impl PageOutcome {
    pub fn has_next(&self) -> bool {
        self.next_page.is_some()
    }

    fn interrupted() -> Self {
        Self {
            interrupted: true,
            ..Self::default()
        }
    }
}

/// Scrapes the page the browser is currently on.
///
/// A page without containers is re-read up to `empty_page_retries` times,
/// one settle delay apart, before it is reported as the end of the catalog.
pub async fn run_page(
    page: &dyn BrowserPage,
    profile: &SiteProfile,
    cancel: &CancellationToken,
    options: PageOptions,
) -> Result<PageOutcome> {
    if profile.lazy_load {
        page.scroll_to_bottom().await?;
        if !pause(cancel, options.settle_delay).await {
            return Ok(PageOutcome::interrupted());
        }
    }

    for look in 0..=options.empty_page_retries {
        let html = page.content().await?;
        if let Some(outcome) = scan(&html, profile, cancel) {
            return Ok(outcome);
        }

        if look < options.empty_page_retries {
            debug!(profile = profile.name, "No product containers yet, waiting for render");
            if !pause(cancel, options.settle_delay).await {
                return Ok(PageOutcome::interrupted());
            }
        }
    }

    info!(profile = profile.name, "No products found on this page");
    Ok(PageOutcome::default())
}

/// Clicks the next-page control and waits for the new page.
pub async fn advance(
    page: &dyn BrowserPage,
    next_selector: &str,
    cancel: &CancellationToken,
    settle_delay: Duration,
) -> Result<()> {
    info!(selector = next_selector, "Moving to the next page");
    page.click(next_selector).await?;
    page.wait_for_settle().await?;
    pause(cancel, settle_delay).await;
    Ok(())
}

/// Waits out `delay`. Returns `false` when `cancel` fired first.
pub async fn pause(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Parses one HTML snapshot. `None` when no container selector matches.
fn scan(html: &str, profile: &SiteProfile, cancel: &CancellationToken) -> Option<PageOutcome> {
    let document = Html::parse_document(html);
    let (container_selector, containers) = profile.container_selectors.select_all(&document)?;
    debug!(
        selector = container_selector,
        containers = containers.len(),
        "Found product containers"
    );

    let mut outcome = PageOutcome::default();
    for container in containers {
        if cancel.is_cancelled() {
            outcome.interrupted = true;
            return Some(outcome);
        }
        outcome.items.push(extract(container, profile));
    }

    // The first match is the element a click lands on.
    outcome.next_page = profile.next_page.iter().find_map(|(raw, selector)| {
        document
            .select(selector)
            .next()
            .filter(|el| !is_disabled(*el))
            .map(|_| raw.to_string())
    });
    Some(outcome)
}

pub(crate) fn is_disabled(element: ElementRef<'_>) -> bool {
    let value = element.value();
    value.attr("disabled").is_some()
        || value.attr("aria-disabled") == Some("true")
        || value.classes().any(|c| c == "disabled")
}

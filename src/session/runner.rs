use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::browser::{BrowserLauncher, BrowserPage};
use crate::config::ScraperConfig;
use crate::models::{ResultSet, SessionOutcome, SessionState, SessionStatus};
use crate::pagination::{self, PageOptions};
use crate::profiles::{ResolvedTarget, SearchStrategy};
use crate::sink::PublishSink;
use crate::utils::error::{AppError, Result};

/// Everything one background run needs, moved onto its task.
pub(super) struct Run {
    pub run_id: Uuid,
    pub launcher: Arc<dyn BrowserLauncher>,
    pub target: ResolvedTarget,
    pub config: ScraperConfig,
    pub sink: Arc<dyn PublishSink>,
    pub cancel: CancellationToken,
    pub status: Arc<watch::Sender<SessionStatus>>,
}

enum AttemptEnd {
    /// No further page to visit.
    Exhausted,
    /// The run was cancelled.
    Stopped,
}

impl Run {
    pub async fn execute(self) {
        let mut results = ResultSet::new();
        let mut attempt = 0u32;

        let outcome = loop {
            if self.cancel.is_cancelled() {
                break SessionOutcome::Cancelled;
            }

            attempt += 1;
            self.status.send_modify(|s| s.attempts = attempt);

            match self.attempt(attempt, &mut results).await {
                Ok(AttemptEnd::Exhausted) => break SessionOutcome::Completed,
                Ok(AttemptEnd::Stopped) => break SessionOutcome::Cancelled,
                Err(_) if self.cancel.is_cancelled() => break SessionOutcome::Cancelled,
                Err(err) => {
                    if err.is_transient() {
                        warn!(run_id = %self.run_id, attempt, error = %err, "Scrape attempt failed");
                    } else {
                        error!(run_id = %self.run_id, attempt, error = %err, "Scrape attempt failed unexpectedly");
                    }

                    if attempt >= self.config.retry_attempts {
                        break SessionOutcome::Failed {
                            reason: err.to_string(),
                        };
                    }

                    info!(
                        run_id = %self.run_id,
                        delay_ms = self.config.retry_delay_ms,
                        "Retrying from the first page"
                    );
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => break SessionOutcome::Cancelled,
                        _ = tokio::time::sleep(self.config.retry_delay()) => {}
                    }
                }
            }
        };

        self.finish(outcome, results.len()).await;
    }

    /// One pass over the catalog on a fresh page. The page is always closed.
    async fn attempt(&self, attempt: u32, results: &mut ResultSet) -> Result<AttemptEnd> {
        let page = self.launcher.open_page().await?;
        let result = self.crawl(page.as_ref(), attempt, results).await;
        if let Err(err) = page.close().await {
            debug!(run_id = %self.run_id, error = %err, "Failed to close page");
        }
        result
    }

    async fn crawl(
        &self,
        page: &dyn BrowserPage,
        attempt: u32,
        results: &mut ResultSet,
    ) -> Result<AttemptEnd> {
        let profile = Arc::clone(&self.target.profile);

        info!(run_id = %self.run_id, attempt, url = %self.target.working_url, "Navigating");
        page.navigate(&self.target.working_url).await?;
        page.wait_for_settle().await?;

        if let Some(query) = self.target.in_page_query.as_deref() {
            if !self.search(page, query).await? {
                return Ok(AttemptEnd::Stopped);
            }
        }

        let options = PageOptions {
            settle_delay: self.config.settle_delay(),
            empty_page_retries: self.config.empty_page_retries,
        };
        let dedupe = attempt > 1;
        let mut page_number = 1u32;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(AttemptEnd::Stopped);
            }

            let outcome = pagination::run_page(page, &profile, &self.cancel, options).await?;
            let found = outcome.items.len();
            let added = results.append_page(outcome.items, dedupe);
            self.sink.publish(results.snapshot());
            let total = results.len();
            self.status.send_modify(|s| s.item_count = total);

            info!(
                run_id = %self.run_id,
                attempt,
                page = page_number,
                found,
                added,
                total,
                "Scraped page"
            );

            if outcome.interrupted {
                return Ok(AttemptEnd::Stopped);
            }

            let Some(next) = outcome.next_page else {
                info!(run_id = %self.run_id, pages = page_number, total, "Reached the last page");
                return Ok(AttemptEnd::Exhausted);
            };

            pagination::advance(page, &next, &self.cancel, self.config.settle_delay()).await?;
            page_number += 1;
        }
    }

    /// Types `query` into the first search input the page offers. Returns
    /// `false` when the run was cancelled while waiting for results.
    async fn search(&self, page: &dyn BrowserPage, query: &str) -> Result<bool> {
        let SearchStrategy::InPage { inputs } = &self.target.profile.search else {
            return Ok(true);
        };

        for (selector, _) in inputs.iter() {
            if self.cancel.is_cancelled() {
                return Ok(false);
            }
            let found = match page
                .wait_for_element(selector, self.config.search_input_timeout())
                .await
            {
                Ok(found) => found,
                Err(AppError::Timeout(_)) => false,
                Err(err) => return Err(err),
            };
            if !found {
                debug!(selector, "Search input not present");
                continue;
            }

            info!(run_id = %self.run_id, selector, query, "Submitting search");
            page.submit_search(selector, query).await?;
            page.wait_for_settle().await?;
            return Ok(pagination::pause(&self.cancel, self.config.settle_delay()).await);
        }

        warn!(
            run_id = %self.run_id,
            candidates = ?inputs.sources(),
            "No search input found, scraping the landing page"
        );
        Ok(true)
    }

    async fn finish(&self, outcome: SessionOutcome, total: usize) {
        match &outcome {
            SessionOutcome::Completed => {
                info!(run_id = %self.run_id, total, "Scrape session completed")
            }
            SessionOutcome::Cancelled => {
                info!(run_id = %self.run_id, total, "Scrape session stopped")
            }
            SessionOutcome::Failed { reason } => {
                error!(run_id = %self.run_id, total, reason = %reason, "Scrape session failed");
                self.status.send_modify(|s| {
                    s.state = SessionState::Failed;
                    s.indicator = SessionState::Failed.indicator().to_string();
                });
                // Subscribers get a turn to see `Failed` before `Stopped` lands.
                tokio::task::yield_now().await;
            }
        }

        self.status.send_modify(|s| {
            s.state = SessionState::Stopped;
            s.indicator = SessionState::Stopped.indicator().to_string();
            s.item_count = total;
            s.outcome = Some(outcome);
            s.finished_at = Some(Utc::now());
        });
    }
}

use anyhow::anyhow;
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use super::{BrowserLauncher, BrowserPage};
use crate::config::ScraperConfig;
use crate::utils::error::{AppError, Result};

/// Launches a headless Chrome per page; the process goes away with the page.
pub struct ChromeLauncher {
    config: ScraperConfig,
}

pub struct ChromePage {
    // Held so the Chrome process lives as long as the page.
    _browser: Browser,
    tab: Arc<Tab>,
    navigation_timeout: Duration,
}

impl ChromeLauncher {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }

    fn launch(config: &ScraperConfig) -> anyhow::Result<(Browser, Arc<Tab>)> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false) // Often needed in containerized environments
            .idle_browser_timeout(config.navigation_timeout() * 4)
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-extensions"),
                OsStr::new("--disable-background-timer-throttling"),
                OsStr::new("--disable-backgrounding-occluded-windows"),
                OsStr::new("--disable-renderer-backgrounding"),
            ])
            .build()
            .map_err(|e| anyhow!("Failed to create launch options: {}", e))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| anyhow!("Failed to launch browser: {}", e))?;

        let tab = browser
            .new_tab()
            .map_err(|e| anyhow!("Failed to create tab: {}", e))?;
        tab.set_default_timeout(config.navigation_timeout());
        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| anyhow!("Failed to set user agent: {}", e))?;

        Ok((browser, tab))
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn open_page(&self) -> Result<Box<dyn BrowserPage>> {
        let config = self.config.clone();
        let (browser, tab) = tokio::task::spawn_blocking(move || Self::launch(&config))
            .await
            .map_err(|e| AppError::Internal(format!("Browser launch task failed: {}", e)))?
            .map_err(|e| AppError::Browser(e.to_string()))?;

        tracing::debug!("Launched Chrome page");
        Ok(Box::new(ChromePage {
            _browser: browser,
            tab,
            navigation_timeout: self.config.navigation_timeout(),
        }))
    }
}

/// CDP calls block, so every call runs on the blocking pool.
async fn blocking<T, F>(tab: &Arc<Tab>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Tab) -> Result<T> + Send + 'static,
{
    let tab = Arc::clone(tab);
    tokio::task::spawn_blocking(move || f(&tab))
        .await
        .map_err(|e| AppError::Internal(format!("Browser task failed: {}", e)))?
}

/// headless_chrome reports waits that ran out as plain errors; sort them
/// out by message so the session can tell them apart.
fn classify(context: &str, err: anyhow::Error) -> AppError {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") || lower.contains("never came") {
        AppError::Timeout(format!("{}: {}", context, message))
    } else {
        AppError::Browser(format!("{}: {}", context, message))
    }
}

#[async_trait]
impl BrowserPage for ChromePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        blocking(&self.tab, move |tab| {
            tab.navigate_to(&url)
                .and_then(|t| t.wait_until_navigated())
                .map(|_| ())
                .map_err(|e| AppError::Navigation {
                    url: url.clone(),
                    message: e.to_string(),
                })
        })
        .await
    }

    async fn content(&self) -> Result<String> {
        blocking(&self.tab, |tab| {
            tab.get_content().map_err(|e| classify("Failed to get page content", e))
        })
        .await
    }

    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let selector = selector.to_string();
        blocking(&self.tab, move |tab| {
            match tab.wait_for_element_with_custom_timeout(&selector, timeout) {
                Ok(_) => Ok(true),
                Err(e) => match classify("Wait for element", e) {
                    AppError::Timeout(_) => Ok(false),
                    // A selector that never matched is reported as a
                    // missing node rather than a timeout.
                    AppError::Browser(msg) if msg.to_lowercase().contains("no element") => Ok(false),
                    other => Err(other),
                },
            }
        })
        .await
    }

    async fn submit_search(&self, selector: &str, text: &str) -> Result<()> {
        let selector = selector.to_string();
        let text = text.to_string();
        blocking(&self.tab, move |tab| {
            let input = tab
                .find_element(&selector)
                .map_err(|e| classify("Search input", e))?;
            input.click().map_err(|e| classify("Focus search input", e))?;
            input
                .type_into(&text)
                .map_err(|e| classify("Type search query", e))?;
            tab.press_key("Enter")
                .map_err(|e| classify("Submit search", e))?;
            Ok(())
        })
        .await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let selector = selector.to_string();
        blocking(&self.tab, move |tab| {
            let element = tab
                .find_element(&selector)
                .map_err(|e| classify("Find element", e))?;
            element
                .scroll_into_view()
                .and_then(|el| el.click())
                .map(|_| ())
                .map_err(|e| classify("Click", e))
        })
        .await
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        blocking(&self.tab, |tab| {
            tab.evaluate("window.scrollTo(0, document.body.scrollHeight)", false)
                .map(|_| ())
                .map_err(|e| classify("Scroll to bottom", e))
        })
        .await
    }

    async fn wait_for_settle(&self) -> Result<()> {
        let timeout = self.navigation_timeout;
        let wait = blocking(&self.tab, |tab| {
            tab.wait_until_navigated()
                .map(|_| ())
                .map_err(|e| classify("Wait for page load", e))
        });
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| AppError::Timeout("Wait for page load".to_string()))?
    }

    async fn close(&self) -> Result<()> {
        blocking(&self.tab, |tab| {
            tab.close(true)
                .map(|_| ())
                .map_err(|e| classify("Close tab", e))
        })
        .await
    }
}

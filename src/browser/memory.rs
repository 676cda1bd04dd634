//! A browser that serves fixed HTML pages from memory.
//!
//! Navigation always lands on the first page; clicking an element on the
//! current page moves to the next one, unless the first match is disabled. Used to replay saved
//! catalog pages offline and to drive the engine deterministically.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{BrowserLauncher, BrowserPage};
use crate::pagination::is_disabled;
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserEvent {
    Open,
    Navigate(String),
    Search { selector: String, text: String },
    Click(String),
    Scroll,
    Close,
}

#[derive(Debug, Default)]
struct State {
    pages: Vec<String>,
    current: usize,
    events: Vec<BrowserEvent>,
    fail_navigations: u32,
    fail_clicks: HashMap<usize, u32>,
    blank_reads: HashMap<usize, u32>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBrowser {
    state: Arc<Mutex<State>>,
}

struct MemoryPage {
    state: Arc<Mutex<State>>,
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|_| AppError::InvalidSelector {
        selector: selector.to_string(),
    })
}

fn has_element(html: &str, selector: &str) -> Result<bool> {
    let parsed = parse_selector(selector)?;
    Ok(Html::parse_document(html).select(&parsed).next().is_some())
}

/// `None` when nothing matches, otherwise whether the first match is live.
fn first_match_enabled(html: &str, selector: &str) -> Result<Option<bool>> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    Ok(document.select(&parsed).next().map(|el| !is_disabled(el)))
}

impl MemoryBrowser {
    pub fn from_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = State {
            pages: pages.into_iter().map(Into::into).collect(),
            ..State::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Loads every `*.html` file in `dir`, in file-name order.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "html") {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(AppError::Validation(format!(
                "No .html pages found in {}",
                dir.as_ref().display()
            )));
        }

        let pages = paths
            .iter()
            .map(std::fs::read_to_string)
            .collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self::from_pages(pages))
    }

    /// The next `times` navigations fail as if the network dropped.
    pub fn fail_navigations(&self, times: u32) -> &Self {
        lock(&self.state).fail_navigations = times;
        self
    }

    /// Clicking away from page `index` (zero based) times out `times` times.
    pub fn fail_clicks_on_page(&self, index: usize, times: u32) -> &Self {
        lock(&self.state).fail_clicks.insert(index, times);
        self
    }

    /// Page `index` renders empty for the first `times` reads.
    pub fn render_late(&self, index: usize, times: u32) -> &Self {
        lock(&self.state).blank_reads.insert(index, times);
        self
    }

    pub fn events(&self) -> Vec<BrowserEvent> {
        lock(&self.state).events.clone()
    }

    pub fn current_page(&self) -> usize {
        lock(&self.state).current
    }
}

#[async_trait]
impl BrowserLauncher for MemoryBrowser {
    async fn open_page(&self) -> Result<Box<dyn BrowserPage>> {
        lock(&self.state).events.push(BrowserEvent::Open);
        Ok(Box::new(MemoryPage {
            state: Arc::clone(&self.state),
        }))
    }
}

#[async_trait]
impl BrowserPage for MemoryPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = lock(&self.state);
        state.events.push(BrowserEvent::Navigate(url.to_string()));
        if state.fail_navigations > 0 {
            state.fail_navigations -= 1;
            return Err(AppError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        state.current = 0;
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        let mut state = lock(&self.state);
        let current = state.current;
        if let Some(remaining) = state.blank_reads.get_mut(&current) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok("<html><body></body></html>".to_string());
            }
        }
        Ok(state.pages.get(current).cloned().unwrap_or_default())
    }

    async fn wait_for_element(&self, selector: &str, _timeout: Duration) -> Result<bool> {
        let state = lock(&self.state);
        match state.pages.get(state.current) {
            Some(html) => has_element(html, selector),
            None => Ok(false),
        }
    }

    async fn submit_search(&self, selector: &str, text: &str) -> Result<()> {
        lock(&self.state).events.push(BrowserEvent::Search {
            selector: selector.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut state = lock(&self.state);
        state.events.push(BrowserEvent::Click(selector.to_string()));

        let current = state.current;
        if let Some(remaining) = state.fail_clicks.get_mut(&current) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(AppError::Timeout(format!("Click on {} never settled", selector)));
            }
        }

        let target = match state.pages.get(current) {
            Some(html) => first_match_enabled(html, selector)?,
            None => None,
        };
        match target {
            None => {
                return Err(AppError::Browser(format!("No element found for {}", selector)));
            }
            // Clicking a disabled control goes nowhere.
            Some(false) => {
                return Err(AppError::Timeout(format!("Click on {} never settled", selector)));
            }
            Some(true) => {}
        }
        state.current = (current + 1).min(state.pages.len().saturating_sub(1));
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        lock(&self.state).events.push(BrowserEvent::Scroll);
        Ok(())
    }

    async fn wait_for_settle(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        lock(&self.state).events.push(BrowserEvent::Close);
        Ok(())
    }
}

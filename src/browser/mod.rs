//! Browser automation capability consumed by the scraping engine.
//!
//! The engine never talks to Chrome directly: it opens a page through a
//! [`BrowserLauncher`] and drives it through [`BrowserPage`]. DOM reads go
//! through [`BrowserPage::content`], which hands back an HTML snapshot that
//! the engine parses itself.

use async_trait::async_trait;
use std::time::Duration;

use crate::utils::error::Result;

pub mod chrome;
pub mod memory;

pub use chrome::ChromeLauncher;
pub use memory::{BrowserEvent, MemoryBrowser};

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Opens a fresh browser context with one page in it.
    async fn open_page(&self) -> Result<Box<dyn BrowserPage>>;
}

#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Serialized DOM of the current document.
    async fn content(&self) -> Result<String>;

    /// `Ok(false)` when the element did not show up within `timeout`.
    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Focuses the input, types `text` and presses Enter.
    async fn submit_search(&self, selector: &str, text: &str) -> Result<()>;

    async fn click(&self, selector: &str) -> Result<()>;

    async fn scroll_to_bottom(&self) -> Result<()>;

    /// Waits for the navigation triggered by the last action to finish.
    async fn wait_for_settle(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

pub mod analytics;
pub mod browser;
pub mod config;
pub mod export;
pub mod extract;
pub mod models;
pub mod pagination;
pub mod profiles;
pub mod session;
pub mod sink;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use analytics::PriceSummary;
pub use browser::{BrowserLauncher, BrowserPage, ChromeLauncher, MemoryBrowser};
pub use config::AppConfig;
pub use models::{ResultSet, ScrapedItem, SessionOutcome, SessionState, SessionStatus, Snapshot};
pub use profiles::{ProfileRegistry, SiteProfile};
pub use session::ScrapeSession;
pub use sink::{LatestSnapshot, PublishSink};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;

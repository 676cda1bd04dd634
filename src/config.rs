use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub scraper: ScraperConfig,
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub headless: bool,
    pub chrome_path: Option<String>,
    pub user_agent: String,
    pub navigation_timeout_ms: u64,
    /// Total attempts per session, the first run included.
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    /// Pause after scrolling, clicking "next" or submitting a search.
    pub settle_delay_ms: u64,
    pub search_input_timeout_ms: u64,
    /// Extra looks at a page that showed no product containers before it
    /// is taken as the end of the catalog.
    pub empty_page_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write a daily rolling log file here in addition to stdout.
    pub directory: Option<String>,
}

impl ScraperConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn search_input_timeout(&self) -> Duration {
        Duration::from_millis(self.search_input_timeout_ms)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            navigation_timeout_ms: 30_000,
            retry_attempts: 3,
            retry_delay_ms: 3_000,
            settle_delay_ms: 2_000,
            search_input_timeout_ms: 5_000,
            empty_page_retries: 1,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8050,
            },
            scraper: ScraperConfig::default(),
            dashboard: DashboardConfig {
                poll_interval_ms: 1_000,
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_dir(dir: &str) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Built-in defaults so a bare checkout runs without config files
            .add_source(Config::try_from(&AppConfig::default())?)
            // Start with default configuration
            .add_source(File::with_name(&format!("{}/default", dir)).required(false))
            // Add environment-specific config
            .add_source(File::with_name(&format!("{}/{}", dir, run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name(&format!("{}/local", dir)).required(false))
            // Add environment variables with prefix "SCRAPER_"
            .add_source(Environment::with_prefix("SCRAPER").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        // Add Chrome path from environment if not set
        if config.scraper.chrome_path.is_none() {
            config.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port must be greater than 0".into()));
        }

        if self.scraper.retry_attempts == 0 {
            return Err(ConfigError::Message("Scraper retry_attempts must be at least 1".into()));
        }

        if self.scraper.navigation_timeout_ms == 0 {
            return Err(ConfigError::Message("Scraper navigation_timeout_ms must be greater than 0".into()));
        }

        if self.scraper.settle_delay_ms > 10_000 {
            return Err(ConfigError::Message("Scraper settle_delay_ms cannot exceed 10000".into()));
        }

        if self.scraper.user_agent.trim().is_empty() {
            return Err(ConfigError::Message("Scraper user_agent cannot be empty".into()));
        }

        if self.dashboard.poll_interval_ms == 0 {
            return Err(ConfigError::Message("Dashboard poll_interval_ms must be greater than 0".into()));
        }

        Ok(())
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Invalid CSS selector: {selector}")]
    InvalidSelector { selector: String },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Navigation and timeout failures are expected on flaky storefronts;
    /// everything else coming out of the automation layer is unexpected.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Navigation { .. } | AppError::Timeout(_))
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

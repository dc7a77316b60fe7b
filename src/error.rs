//! Custom error types for blogcircles

use thiserror::Error;

/// Main error type for blogcircles operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Circle error: {0}")]
    Circle(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io(err.error)
    }
}

/// Result type alias for blogcircles
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single page fetch.
///
/// Transport failures are worth another attempt; a response with an error
/// status is final.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transport { .. })
    }

    pub(crate) fn transport(url: &str, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("timed out: {}", err)
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            err.to_string()
        };
        FetchError::Transport {
            url: url.to_string(),
            message,
        }
    }
}

//! Unified error type for lighthouse-watch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Weather API error (status={status}): {message}")]
    WeatherApi { status: u16, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store already initialized")]
    AlreadyInitialized,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for failures caused by missing or invalid configuration.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

//! Shared types, config, and error definitions for lighthouse-watch.

pub mod config;
pub mod error;
pub mod source;
pub mod types;

pub use config::AppConfig;
pub use error::Error;
pub use source::ForecastSource;
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;

//! Web Resource Scanner: discovers and catalogues the assets behind a URL
//!
//! This crate crawls a target site, records every image, script, stylesheet
//! and document it can reach as a `WebResource` within a `ScanSession`, and
//! re-downloads individual resources on demand while keeping an append-only
//! download history.

pub mod api;
pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for scanner operations
#[derive(Debug, Error)]
pub enum ScannerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: model::ScanStatus,
        to: model::ScanStatus,
    },

    #[error("Scan session {0} is not pending")]
    SessionNotPending(i64),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised at the request-intake boundary, before any session exists
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} has an invalid format: {reason}")]
    InvalidFormat { field: &'static str, reason: String },

    #[error("{field} is out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for scanner operations
pub type Result<T> = std::result::Result<T, ScannerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for intake validation
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

// Re-export commonly used types
pub use api::{ResourceFilter, ScanRequest};
pub use config::Config;
pub use crawler::{classify, extract, DownloadManager, Fetcher, ScanOrchestrator};
pub use model::{DownloadHistory, ResourceType, ScanSession, ScanStatus, WebResource};
pub use storage::{SqliteStorage, Storage};

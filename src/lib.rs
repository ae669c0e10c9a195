//! Sumi-Harvest: a depth-bounded document harvester
//!
//! This crate walks a site from a seed URL, checks every discovered resource
//! with a HEAD request and routes it by content type to pluggable handlers.
//! The built-in handlers record PDFs to a CSV ledger and store their bodies
//! on disk. Fetches go through a retrying downloader with optional proxy
//! rotation and per-run memoization.

pub mod config;
pub mod crawler;
pub mod handlers;
pub mod logging;
pub mod output;
pub mod proxy;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Handler error: {0}")]
    Handler(#[from] handlers::HandlerError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crawl task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
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

    #[error("No HEAD or GET handler registered for any content type")]
    NoHandlers,

    #[error("Crawl method '{0}' needs an externally supplied fetch strategy")]
    UnsupportedMethod(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for Sumi-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, CrawlMethod, CrawlReport, CrawlRequest, Crawler};
pub use url::{extract_host, normalize};

//! Handler traits and error types
//!
//! This module defines the capability interfaces the crawler dispatches to.
//! Implementations must be thread-safe since pages are processed by several
//! workers at once.

use crate::crawler::FetchResponse;
use thiserror::Error;

/// Errors that can occur inside a handler
///
/// Handler errors are persistence failures; the crawler aborts the run when
/// one is returned.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Rejected {url}: {reason}")]
    Rejected { url: String, reason: String },

    #[error("Handler task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for handler operations
pub type HandlerResult<T> = Result<T, HandlerError>;

/// What the crawler should do after a HEAD handler ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadOutcome {
    /// Go on with the GET handler, if one is registered
    Continue,

    /// Do not fetch the body for the GET handler
    Skip,
}

/// Consumer of HEAD responses
///
/// HEAD handlers are cheap: they see headers only and decide whether the
/// resource is worth a full fetch.
pub trait HeadHandler: Send + Sync {
    /// Handles the HEAD response for `url`
    ///
    /// # Arguments
    ///
    /// * `url` - The normalized URL that was checked
    /// * `response` - The HEAD response (empty body)
    fn on_head(&self, url: &str, response: &FetchResponse) -> HandlerResult<HeadOutcome>;
}

/// Consumer of full GET responses
pub trait GetHandler: Send + Sync {
    /// Handles the GET response for `url`
    ///
    /// # Arguments
    ///
    /// * `url` - The normalized URL that was fetched
    /// * `response` - The full response, body included
    fn on_get(&self, url: &str, response: &FetchResponse) -> HandlerResult<()>;
}

/// Gatekeeper for discovered links
pub trait ProcessHandler: Send + Sync {
    /// Returns true if the normalized link should be enqueued
    fn accept(&self, link: &str) -> bool;
}

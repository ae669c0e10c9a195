//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic and proxy rotation
//! - Memoization of fetch outcomes
//! - HTML parsing and link extraction
//! - Overall traversal and handler dispatch

mod cache;
mod coordinator;
mod fetcher;
mod parser;
mod strategy;

pub use cache::{CacheKey, FetchCache, DEFAULT_CACHE_CAPACITY};
pub use coordinator::{CrawlOptions, CrawlReport, Crawler, FrontierEntry};
pub use fetcher::{
    build_http_client, Downloader, DownloaderConfig, FetchFailure, FetchMode, FetchResponse,
    Session, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT,
};
pub use parser::{extract_links_simple, parse_html, ParsedPage};
pub use strategy::{FetchStrategy, HttpStrategy};

use crate::handlers::{
    CsvStatsHandler, DefaultProcessHandler, GetHandler, HandlerTable, HeadHandler,
    LocalStorageHandler, ProcessHandler, StorageLayout, PDF_CONTENT_TYPE,
};
use crate::proxy::ProxyManager;
use crate::url::{extract_netloc, normalize};
use crate::{ConfigError, HarvestError, UrlError};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How pages are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrawlMethod {
    /// Plain HTTP through the [`Downloader`]
    #[default]
    Normal,

    /// Browser automation through a WebDriver binary; needs a strategy
    /// supplied with [`CrawlRequest::strategy`]
    Browser,
}

impl fmt::Display for CrawlMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Browser => f.write_str("browser"),
        }
    }
}

impl FromStr for CrawlMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "browser" => Ok(Self::Browser),
            other => Err(ConfigError::Validation(format!(
                "Unknown crawl method '{}', expected 'normal' or 'browser'",
                other
            ))),
        }
    }
}

/// Everything needed to run one harvest
///
/// Defaults match the classic invocation: depth 2, `normal` method,
/// `geckodriver` as the driver binary, page name taken from the seed, no
/// proxies, same-host only, one worker.
pub struct CrawlRequest {
    pub url: String,
    pub output_dir: PathBuf,
    pub depth: u32,
    pub method: CrawlMethod,
    pub driver_path: String,
    pub page_name: Option<String>,
    pub use_proxy: bool,
    pub follow_foreign_hosts: bool,
    pub workers: usize,
    pub downloader: DownloaderConfig,
    head_handlers: Option<Vec<(String, Arc<dyn HeadHandler>)>>,
    get_handlers: Option<Vec<(String, Arc<dyn GetHandler>)>>,
    process_handler: Option<Arc<dyn ProcessHandler>>,
    strategy: Option<Arc<dyn FetchStrategy>>,
    proxies: Option<Arc<ProxyManager>>,
    cache: Option<Arc<FetchCache>>,
    cancel: CancellationToken,
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output_dir: output_dir.into(),
            depth: 2,
            method: CrawlMethod::Normal,
            driver_path: "geckodriver".to_string(),
            page_name: None,
            use_proxy: false,
            follow_foreign_hosts: false,
            workers: 1,
            downloader: DownloaderConfig::default(),
            head_handlers: None,
            get_handlers: None,
            process_handler: None,
            strategy: None,
            proxies: None,
            cache: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn method(mut self, method: CrawlMethod) -> Self {
        self.method = method;
        self
    }

    pub fn driver_path(mut self, driver_path: impl Into<String>) -> Self {
        self.driver_path = driver_path.into();
        self
    }

    pub fn page_name(mut self, page_name: impl Into<String>) -> Self {
        self.page_name = Some(page_name.into());
        self
    }

    pub fn use_proxy(mut self, use_proxy: bool) -> Self {
        self.use_proxy = use_proxy;
        self
    }

    pub fn follow_foreign_hosts(mut self, follow: bool) -> Self {
        self.follow_foreign_hosts = follow;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn downloader(mut self, config: DownloaderConfig) -> Self {
        self.downloader = config;
        self
    }

    /// Replaces the default CSV recorder with the given HEAD handlers
    pub fn head_handlers(mut self, handlers: Vec<(String, Arc<dyn HeadHandler>)>) -> Self {
        self.head_handlers = Some(handlers);
        self
    }

    /// Replaces the default PDF store with the given GET handlers
    pub fn get_handlers(mut self, handlers: Vec<(String, Arc<dyn GetHandler>)>) -> Self {
        self.get_handlers = Some(handlers);
        self
    }

    pub fn process_handler(mut self, handler: Arc<dyn ProcessHandler>) -> Self {
        self.process_handler = Some(handler);
        self
    }

    /// Uses a caller-supplied fetch strategy instead of plain HTTP
    pub fn strategy(mut self, strategy: Arc<dyn FetchStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Shares a proxy pool with other crawls instead of a fresh empty one
    pub fn proxies(mut self, proxies: Arc<ProxyManager>) -> Self {
        self.proxies = Some(proxies);
        self
    }

    /// Shares a fetch cache with other crawls instead of a fresh one
    pub fn cache(mut self, cache: Arc<FetchCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Builds the handler table, failing before any I/O if it would be empty
    fn build_handlers(&mut self, layout: &StorageLayout) -> Result<HandlerTable, HarvestError> {
        let head_overridden = self.head_handlers.as_ref().is_some_and(|h| h.is_empty());
        let get_overridden = self.get_handlers.as_ref().is_some_and(|h| h.is_empty());
        if head_overridden && get_overridden {
            return Err(ConfigError::NoHandlers.into());
        }

        let mut table = HandlerTable::new();

        match self.get_handlers.take() {
            Some(handlers) => {
                for (content_type, handler) in handlers {
                    table.register_get(content_type, handler);
                }
            }
            None => table.register_get(
                PDF_CONTENT_TYPE,
                Arc::new(LocalStorageHandler::new(layout.clone())),
            ),
        }

        match self.head_handlers.take() {
            Some(handlers) => {
                for (content_type, handler) in handlers {
                    table.register_head(content_type, handler);
                }
            }
            None => table.register_head(
                PDF_CONTENT_TYPE,
                Arc::new(CsvStatsHandler::new(layout.clone())?),
            ),
        }

        Ok(table)
    }

    fn build_strategy(&mut self) -> Result<Arc<dyn FetchStrategy>, HarvestError> {
        if let Some(strategy) = self.strategy.take() {
            return Ok(strategy);
        }

        match self.method {
            CrawlMethod::Normal => {
                let proxies = self
                    .proxies
                    .take()
                    .unwrap_or_else(|| Arc::new(ProxyManager::empty()));
                let capacity = self.downloader.cache_capacity;
                let cache = self
                    .cache
                    .take()
                    .unwrap_or_else(|| Arc::new(FetchCache::with_capacity(capacity)));
                let downloader = Arc::new(Downloader::new(self.downloader.clone(), proxies, cache));
                let session = downloader.session()?;
                Ok(Arc::new(HttpStrategy::new(downloader, session, self.use_proxy)))
            }
            CrawlMethod::Browser => Err(ConfigError::UnsupportedMethod(format!(
                "{} (driver {})",
                self.method, self.driver_path
            ))
            .into()),
        }
    }
}

/// Runs a complete harvest
///
/// This is the main entry point for a crawl. It will:
/// 1. Resolve the page name (the seed's host and port by default)
/// 2. Build the fetch strategy for the crawl method
/// 3. Register the default or supplied handlers
/// 4. Walk the site up to the requested depth
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl finished or was cancelled
/// * `Err(HarvestError)` - Configuration error, or a handler failed to persist
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::crawler::{crawl, CrawlRequest};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = crawl(CrawlRequest::new("https://example.com/reports", "./harvest").depth(1)).await?;
/// println!("Stored {} documents", report.get_handled);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(mut request: CrawlRequest) -> Result<CrawlReport, HarvestError> {
    let seed = normalize(&request.url);
    let page_name = match request.page_name.clone() {
        Some(name) => name,
        None => extract_netloc(&seed).ok_or_else(|| UrlError::MissingHost(seed.clone()))?,
    };
    let layout = StorageLayout::new(&request.output_dir, page_name);

    let strategy = request.build_strategy()?;
    let handlers = request.build_handlers(&layout)?;
    let process = request
        .process_handler
        .take()
        .unwrap_or_else(|| Arc::new(DefaultProcessHandler));

    let options = CrawlOptions {
        max_depth: request.depth,
        follow_foreign_hosts: request.follow_foreign_hosts,
        workers: request.workers,
    };

    let crawler = Crawler::new(strategy, handlers, process, options)?;
    crawler.crawl_with_cancel(&seed, request.cancel.clone()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_crawl_method_from_str() {
        assert_eq!("normal".parse::<CrawlMethod>().unwrap(), CrawlMethod::Normal);
        assert_eq!(" Browser ".parse::<CrawlMethod>().unwrap(), CrawlMethod::Browser);
        assert!("selenium".parse::<CrawlMethod>().is_err());
    }

    #[test]
    fn test_request_defaults() {
        let request = CrawlRequest::new("http://a.com", "out");
        assert_eq!(request.depth, 2);
        assert_eq!(request.method, CrawlMethod::Normal);
        assert_eq!(request.driver_path, "geckodriver");
        assert_eq!(request.page_name, None);
        assert!(!request.follow_foreign_hosts);
        assert_eq!(request.workers, 1);
    }

    #[tokio::test]
    async fn test_empty_handler_overrides_fail_before_io() {
        let dir = TempDir::new().unwrap();
        let output_dir = dir.path().join("never-created");
        let request = CrawlRequest::new("http://127.0.0.1:9/", &output_dir)
            .head_handlers(Vec::new())
            .get_handlers(Vec::new());

        let result = crawl(request).await;
        assert!(matches!(
            result,
            Err(HarvestError::Config(ConfigError::NoHandlers))
        ));
        assert!(!output_dir.exists());
    }

    #[tokio::test]
    async fn test_browser_method_requires_strategy() {
        let dir = TempDir::new().unwrap();
        let request =
            CrawlRequest::new("http://127.0.0.1:9/", dir.path()).method(CrawlMethod::Browser);

        let result = crawl(request).await;
        assert!(matches!(
            result,
            Err(HarvestError::Config(ConfigError::UnsupportedMethod(_)))
        ));
        assert!(!dir.path().join("127.0.0.1:9.csv").exists());
    }
}

//! HTTP downloader
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - HEAD requests to learn a resource's Content-Type
//! - GET requests to fetch full bodies
//! - Bounded retries, with proxy rotation when proxy mode is on
//! - Memoization of outcomes through a shared [`FetchCache`]

use crate::crawler::cache::{CacheKey, FetchCache, DEFAULT_CACHE_CAPACITY};
use crate::proxy::{ProxyDescriptor, ProxyManager, ProxySelection};
use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED};
use reqwest::{Client, Method, Proxy};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of retries after the initial attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default user agent string
pub const DEFAULT_USER_AGENT: &str = concat!("SumiHarvest/", env!("CARGO_PKG_VERSION"));

/// HTTP method of a logical fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchMode {
    Get,
    Head,
}

impl FetchMode {
    fn method(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Head => Method::HEAD,
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Head => f.write_str("HEAD"),
        }
    }
}

/// A successful (2xx) response, fully buffered
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    /// Final URL after redirects
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Response headers
    pub headers: HeaderMap,

    /// Response body (empty for HEAD)
    pub body: Bytes,
}

impl FetchResponse {
    /// Media type from the Content-Type header, without parameters
    ///
    /// `text/html; charset=utf-8` becomes `text/html`.
    pub fn content_type(&self) -> Option<String> {
        let value = self.headers.get(CONTENT_TYPE)?.to_str().ok()?;
        let media_type = value.split(';').next()?.trim().to_ascii_lowercase();
        if media_type.is_empty() {
            None
        } else {
            Some(media_type)
        }
    }

    /// Content-Length header value, if present and numeric
    pub fn content_length(&self) -> Option<u64> {
        self.header_str(CONTENT_LENGTH.as_str())?.trim().parse().ok()
    }

    /// Last-Modified header value, verbatim
    pub fn last_modified(&self) -> Option<&str> {
        self.header_str(LAST_MODIFIED.as_str())
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

/// Why a single attempt failed
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid proxy {url}: {message}")]
    Proxy { url: String, message: String },

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for FetchFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// Downloader settings
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Per-request timeout
    pub timeout: Duration,

    /// Retries after the initial attempt before giving up
    pub max_retries: u32,

    /// User agent sent with every request
    pub user_agent: String,

    /// Fetch outcomes remembered per run
    pub cache_capacity: usize,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// A client identity; fetches from different sessions are cached apart
#[derive(Debug, Clone)]
pub struct Session {
    id: u64,
    client: Client,
}

impl Session {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Builds an HTTP client with the downloader settings
///
/// # Arguments
///
/// * `config` - Timeout and user agent to apply
/// * `proxy` - Route every request through this proxy when given
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::crawler::{build_http_client, DownloaderConfig};
///
/// let client = build_http_client(&DownloaderConfig::default(), None).unwrap();
/// ```
pub fn build_http_client(
    config: &DownloaderConfig,
    proxy: Option<&ProxyDescriptor>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout)
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(&proxy.url)?);
    }

    builder.build()
}

/// Executes logical fetches with retry, proxy rotation and memoization
///
/// A fetch never returns an error: `None` is the only failure signal, and it
/// is final for that call.
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | 2xx | Return the buffered response |
/// | Non-2xx, timeout, connection error | Retry up to `max_retries` times |
/// | Failure in proxy mode | Rotate to the next proxy, then retry |
/// | Proxy mode with empty pool | Fail immediately, no direct request |
/// | Retries exhausted | Return `None` |
pub struct Downloader {
    config: DownloaderConfig,
    proxies: Arc<ProxyManager>,
    cache: Arc<FetchCache>,
    proxy_clients: Mutex<HashMap<String, Client>>,
    next_session: AtomicU64,
}

impl Downloader {
    pub fn new(config: DownloaderConfig, proxies: Arc<ProxyManager>, cache: Arc<FetchCache>) -> Self {
        Self {
            config,
            proxies,
            cache,
            proxy_clients: Mutex::new(HashMap::new()),
            next_session: AtomicU64::new(1),
        }
    }

    /// Creates a new session with its own direct client
    pub fn session(&self) -> Result<Session, reqwest::Error> {
        Ok(Session {
            id: self.next_session.fetch_add(1, Ordering::Relaxed),
            client: build_http_client(&self.config, None)?,
        })
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    pub fn proxies(&self) -> &Arc<ProxyManager> {
        &self.proxies
    }

    pub fn cache(&self) -> &Arc<FetchCache> {
        &self.cache
    }

    /// Fetches a URL, starting with a fresh retry counter
    pub async fn fetch(
        &self,
        session: &Session,
        url: &str,
        mode: FetchMode,
        use_proxy: bool,
    ) -> Option<FetchResponse> {
        self.fetch_from(session, url, mode, use_proxy, 0).await
    }

    /// Fetches a URL with the retry counter already at `retries`
    ///
    /// The cache is consulted first with the call-time counter as part of
    /// the key; a hit returns without touching the network.
    pub async fn fetch_from(
        &self,
        session: &Session,
        url: &str,
        mode: FetchMode,
        use_proxy: bool,
        retries: u32,
    ) -> Option<FetchResponse> {
        let key = CacheKey::new(session.id, url, mode, use_proxy, retries);
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("Cache hit for {} {}", mode, url);
            return cached;
        }

        let result = self.fetch_uncached(session, url, mode, use_proxy, retries).await;
        self.cache.insert(key, result.clone());
        result
    }

    async fn fetch_uncached(
        &self,
        session: &Session,
        url: &str,
        mode: FetchMode,
        use_proxy: bool,
        mut retries: u32,
    ) -> Option<FetchResponse> {
        loop {
            let selection = use_proxy.then(|| self.proxies.get_proxy());

            let outcome = match &selection {
                Some(ProxySelection { proxy: None, .. }) => {
                    tracing::warn!(
                        "Proxy mode requested for {} but the proxy pool is empty",
                        url
                    );
                    return None;
                }
                Some(ProxySelection {
                    proxy: Some(proxy), ..
                }) => match self.proxy_client(proxy) {
                    Ok(client) => self.attempt(&client, url, mode).await,
                    Err(failure) => Err(failure),
                },
                None => self.attempt(&session.client, url, mode).await,
            };

            match outcome {
                Ok(response) => return Some(response),
                Err(failure) => {
                    tracing::warn!(
                        "{} {} failed (attempt {}): {}",
                        mode,
                        url,
                        retries + 1,
                        failure
                    );

                    if retries >= self.config.max_retries {
                        tracing::warn!("Giving up on {} {} after {} attempts", mode, url, retries + 1);
                        return None;
                    }
                    retries += 1;

                    if let Some(selection) = &selection {
                        self.proxies.change_proxy(selection.index);
                    }
                }
            }
        }
    }

    /// Issues one request; only 2xx responses succeed
    async fn attempt(
        &self,
        client: &Client,
        url: &str,
        mode: FetchMode,
    ) -> Result<FetchResponse, FetchFailure> {
        let response = client.request(mode.method(), url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        let final_url = response.url().to_string();
        let headers = response.headers().clone();
        let body = match mode {
            FetchMode::Get => response.bytes().await?,
            FetchMode::Head => Bytes::new(),
        };

        Ok(FetchResponse {
            url: final_url,
            status: status.as_u16(),
            headers,
            body,
        })
    }

    /// Returns the client bound to a proxy, building it on first use
    fn proxy_client(&self, proxy: &ProxyDescriptor) -> Result<Client, FetchFailure> {
        let mut clients = self
            .proxy_clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(client) = clients.get(&proxy.url) {
            return Ok(client.clone());
        }

        let client = build_http_client(&self.config, Some(proxy)).map_err(|e| FetchFailure::Proxy {
            url: proxy.url.clone(),
            message: e.to_string(),
        })?;
        clients.insert(proxy.url.clone(), client.clone());
        Ok(client)
    }
}

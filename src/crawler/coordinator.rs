//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the traversal loop, which:
//! - Owns the frontier queue and the visited set
//! - Applies the depth and host-scope bounds before any fetch
//! - Issues HEAD and GET requests through the fetch strategy
//! - Dispatches responses to handlers by content type
//! - Extracts and filters links from HTML pages
//!
//! Up to `workers` pages are processed concurrently. The coordinator is the
//! only owner of the frontier and visited set, so the check-and-mark of a URL
//! happens in one place and no URL is fetched twice.

use crate::crawler::fetcher::{FetchMode, FetchResponse};
use crate::crawler::parser::parse_html;
use crate::crawler::strategy::FetchStrategy;
use crate::handlers::{
    GetHandler, HandlerError, HandlerTable, HeadHandler, HeadOutcome, ProcessHandler,
    HTML_CONTENT_TYPE,
};
use crate::url::{extract_netloc, in_scope, normalize};
use crate::{ConfigError, HarvestError, UrlError};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Traversal bounds and parallelism
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Maximum link depth from the seed; pages at this depth are fetched but
    /// their links are not followed
    pub max_depth: u32,

    /// Whether to fetch URLs on hosts other than the seed's
    pub follow_foreign_hosts: bool,

    /// Number of pages processed concurrently (1 = strictly sequential)
    pub workers: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_depth: 2,
            follow_foreign_hosts: false,
            workers: 1,
        }
    }
}

/// A URL waiting in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized URL
    pub url: String,

    /// Link hops from the seed
    pub depth: u32,
}

/// Counters describing a finished crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Distinct URLs popped from the frontier
    pub visited: usize,

    /// URLs whose HEAD request succeeded
    pub fetched: usize,

    /// URLs abandoned after a failed HEAD or GET
    pub failed: usize,

    /// URLs skipped for exceeding the depth bound
    pub skipped_depth: usize,

    /// URLs skipped for lying on a foreign host
    pub skipped_foreign: usize,

    /// HEAD handler invocations
    pub head_handled: usize,

    /// GET handler invocations
    pub get_handled: usize,

    /// GETs vetoed by a HEAD handler
    pub vetoed: usize,

    /// Links accepted into the frontier
    pub enqueued: usize,

    /// Whether the crawl stopped on cancellation
    pub cancelled: bool,
}

impl CrawlReport {
    fn merge(&mut self, page: &PageOutcome) {
        self.fetched += usize::from(page.fetched);
        self.failed += usize::from(page.failed);
        self.head_handled += usize::from(page.head_handled);
        self.get_handled += usize::from(page.get_handled);
        self.vetoed += usize::from(page.vetoed);
    }
}

/// Result of processing one frontier entry
#[derive(Debug, Default)]
struct PageOutcome {
    depth: u32,
    fetched: bool,
    failed: bool,
    head_handled: bool,
    get_handled: bool,
    vetoed: bool,
    links: Vec<String>,
}

struct CrawlContext {
    strategy: Arc<dyn FetchStrategy>,
    handlers: HandlerTable,
    process: Arc<dyn ProcessHandler>,
    options: CrawlOptions,
}

/// Depth- and host-bounded traversal engine
pub struct Crawler {
    context: Arc<CrawlContext>,
}

impl Crawler {
    /// Creates a crawler
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to crawl
    /// * `Err(ConfigError::NoHandlers)` - No HEAD or GET handler registered
    pub fn new(
        strategy: Arc<dyn FetchStrategy>,
        handlers: HandlerTable,
        process: Arc<dyn ProcessHandler>,
        options: CrawlOptions,
    ) -> Result<Self, ConfigError> {
        if handlers.is_empty() {
            return Err(ConfigError::NoHandlers);
        }

        let options = CrawlOptions {
            workers: options.workers.max(1),
            ..options
        };

        Ok(Self {
            context: Arc::new(CrawlContext {
                strategy,
                handlers,
                process,
                options,
            }),
        })
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.context.options
    }

    /// Crawls from `seed` until the frontier is exhausted
    pub async fn crawl(&self, seed: &str) -> Result<CrawlReport, HarvestError> {
        self.crawl_with_cancel(seed, CancellationToken::new()).await
    }

    /// Crawls from `seed`, stopping early once `cancel` fires
    ///
    /// Pages already in flight stop before their next fetch; the report of a
    /// cancelled crawl has `cancelled` set.
    pub async fn crawl_with_cancel(
        &self,
        seed: &str,
        cancel: CancellationToken,
    ) -> Result<CrawlReport, HarvestError> {
        let options = &self.context.options;
        let seed = normalize(seed);
        let seed_netloc =
            extract_netloc(&seed).ok_or_else(|| UrlError::MissingHost(seed.clone()))?;

        tracing::info!(
            "Starting crawl of {} (max depth {}, {} worker(s), strategy {})",
            seed,
            options.max_depth,
            options.workers,
            self.context.strategy.name()
        );

        let mut frontier = VecDeque::from([FrontierEntry {
            url: seed,
            depth: 0,
        }]);
        let mut visited: HashSet<String> = HashSet::new();
        let mut tasks: JoinSet<Result<PageOutcome, HandlerError>> = JoinSet::new();
        let mut report = CrawlReport::default();

        loop {
            if cancel.is_cancelled() {
                tracing::info!("Crawl cancelled, waiting for {} in-flight page(s)", tasks.len());
                report.cancelled = true;
                while let Some(joined) = tasks.join_next().await {
                    report.merge(&joined??);
                }
                break;
            }

            // Fill free worker slots from the frontier
            while tasks.len() < options.workers {
                let Some(entry) = frontier.pop_front() else {
                    break;
                };

                if !visited.insert(entry.url.clone()) {
                    continue;
                }
                report.visited += 1;

                if entry.depth > options.max_depth {
                    tracing::info!("Skipping {}: depth {} exceeds limit", entry.url, entry.depth);
                    report.skipped_depth += 1;
                    continue;
                }

                if !options.follow_foreign_hosts && !in_scope(&entry.url, &seed_netloc) {
                    tracing::info!("Skipping {}: foreign host", entry.url);
                    report.skipped_foreign += 1;
                    continue;
                }

                tasks.spawn(process_page(
                    Arc::clone(&self.context),
                    entry,
                    cancel.clone(),
                ));
            }

            let joined = tokio::select! {
                _ = cancel.cancelled() => continue,
                joined = tasks.join_next() => joined,
            };

            // Nothing in flight and nothing left to schedule
            let Some(joined) = joined else {
                break;
            };

            let page = match joined? {
                Ok(page) => page,
                Err(e) => {
                    tasks.abort_all();
                    return Err(e.into());
                }
            };
            report.merge(&page);

            for link in page.links {
                if visited.contains(&link) {
                    continue;
                }
                report.enqueued += 1;
                frontier.push_back(FrontierEntry {
                    url: link,
                    depth: page.depth + 1,
                });
            }
        }

        tracing::info!(
            "Crawl finished: {} visited, {} fetched, {} failed, {} stored",
            report.visited,
            report.fetched,
            report.failed,
            report.get_handled
        );

        Ok(report)
    }
}

/// Processes one in-scope frontier entry
///
/// Fetch failures are logged and end the branch; handler errors propagate.
async fn process_page(
    context: Arc<CrawlContext>,
    entry: FrontierEntry,
    cancel: CancellationToken,
) -> Result<PageOutcome, HandlerError> {
    let mut outcome = PageOutcome {
        depth: entry.depth,
        ..PageOutcome::default()
    };
    let url = entry.url.as_str();

    if cancel.is_cancelled() {
        return Ok(outcome);
    }

    let Some(head) = context.strategy.fetch(url, FetchMode::Head).await else {
        tracing::warn!("HEAD request failed for {}, abandoning", url);
        outcome.failed = true;
        return Ok(outcome);
    };
    outcome.fetched = true;

    let content_type = head.content_type().unwrap_or_default();
    tracing::debug!("{} has content type '{}'", url, content_type);

    // HEAD handler may veto the download
    let mut vetoed = false;
    if let Some(handler) = context.handlers.head_handler(&content_type) {
        outcome.head_handled = true;
        if run_head_handler(Arc::clone(handler), url, &head).await? == HeadOutcome::Skip {
            vetoed = true;
            outcome.vetoed = true;
        }
    }

    let mut body: Option<FetchResponse> = None;
    if let Some(handler) = context.handlers.get_handler(&content_type).filter(|_| !vetoed) {
        if cancel.is_cancelled() {
            return Ok(outcome);
        }

        match context.strategy.fetch(url, FetchMode::Get).await {
            Some(response) => {
                run_get_handler(Arc::clone(handler), url, &response).await?;
                outcome.get_handled = true;
                body = Some(response);
            }
            None => {
                tracing::warn!("GET request failed for {}, abandoning", url);
                outcome.failed = true;
                return Ok(outcome);
            }
        }
    }

    let inspect = entry.depth < context.options.max_depth
        && (is_html(&content_type) || context.strategy.renders_html());
    if !inspect {
        return Ok(outcome);
    }

    let page = match body {
        Some(response) => response,
        None => {
            if cancel.is_cancelled() {
                return Ok(outcome);
            }
            match context.strategy.fetch(url, FetchMode::Get).await {
                Some(response) => response,
                None => {
                    tracing::warn!("GET request failed for {}, links not extracted", url);
                    outcome.failed = true;
                    return Ok(outcome);
                }
            }
        }
    };

    outcome.links = discover_links(&context, url, &page);
    Ok(outcome)
}

/// Runs a HEAD handler on the blocking pool, since handlers do file I/O
async fn run_head_handler(
    handler: Arc<dyn HeadHandler>,
    url: &str,
    response: &FetchResponse,
) -> Result<HeadOutcome, HandlerError> {
    let url = url.to_string();
    let response = response.clone();
    tokio::task::spawn_blocking(move || handler.on_head(&url, &response)).await?
}

/// Runs a GET handler on the blocking pool
async fn run_get_handler(
    handler: Arc<dyn GetHandler>,
    url: &str,
    response: &FetchResponse,
) -> Result<(), HandlerError> {
    let url = url.to_string();
    let response = response.clone();
    tokio::task::spawn_blocking(move || handler.on_get(&url, &response)).await?
}

/// Extracts, normalizes and filters the links of an HTML page
fn discover_links(context: &CrawlContext, url: &str, page: &FetchResponse) -> Vec<String> {
    let base = match Url::parse(&page.url).or_else(|_| Url::parse(url)) {
        Ok(base) => base,
        Err(e) => {
            tracing::warn!("Cannot resolve links of {}: {}", url, e);
            return Vec::new();
        }
    };

    let parsed = parse_html(&page.text(), &base);
    if let Some(title) = &parsed.title {
        tracing::debug!("Parsed '{}' ({} links) from {}", title, parsed.links.len(), url);
    }

    let mut seen = HashSet::new();
    parsed
        .links
        .into_iter()
        .map(|link| normalize(&link))
        .filter(|link| {
            let accepted = context.process.accept(link);
            if !accepted {
                tracing::debug!("Link {} rejected by process handler", link);
            }
            accepted
        })
        .filter(|link| link != url && seen.insert(link.clone()))
        .collect()
}

fn is_html(content_type: &str) -> bool {
    content_type == HTML_CONTENT_TYPE || content_type == "application/xhtml+xml"
}

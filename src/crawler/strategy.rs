//! Fetch strategies
//!
//! The crawler never talks to the network directly; it asks a
//! [`FetchStrategy`] for HEAD and GET responses. [`HttpStrategy`] is the
//! `normal` crawl method backed by the [`Downloader`]. Other methods, such as
//! driving a browser through a WebDriver binary, plug in by implementing the
//! same trait.

use crate::crawler::fetcher::{Downloader, FetchMode, FetchResponse, Session};
use async_trait::async_trait;
use std::sync::Arc;

/// Source of responses for the crawler
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Fetches a URL; `None` means the fetch failed permanently
    async fn fetch(&self, url: &str, mode: FetchMode) -> Option<FetchResponse>;

    /// Short name used in logs
    fn name(&self) -> &str;

    /// Whether every GET body is rendered HTML worth scanning for links,
    /// whatever its Content-Type (true for browser-backed strategies)
    fn renders_html(&self) -> bool {
        false
    }
}

/// Plain HTTP fetching through the retrying downloader
pub struct HttpStrategy {
    downloader: Arc<Downloader>,
    session: Session,
    use_proxy: bool,
}

impl HttpStrategy {
    pub fn new(downloader: Arc<Downloader>, session: Session, use_proxy: bool) -> Self {
        Self {
            downloader,
            session,
            use_proxy,
        }
    }

    pub fn downloader(&self) -> &Arc<Downloader> {
        &self.downloader
    }
}

#[async_trait]
impl FetchStrategy for HttpStrategy {
    async fn fetch(&self, url: &str, mode: FetchMode) -> Option<FetchResponse> {
        self.downloader
            .fetch(&self.session, url, mode, self.use_proxy)
            .await
    }

    fn name(&self) -> &str {
        if self.use_proxy {
            "http+proxy"
        } else {
            "http"
        }
    }
}

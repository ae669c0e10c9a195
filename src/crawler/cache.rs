//! Memoization cache for fetch results
//!
//! A [`FetchCache`] remembers the outcome of recent logical fetches,
//! including permanent failures, so the same URL referenced from many pages
//! costs one network round-trip. The cache holds at most `capacity` entries
//! and evicts the least recently used one when full.

use crate::crawler::fetcher::{FetchMode, FetchResponse};
use lru::LruCache;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Entries kept when no capacity is given
pub const DEFAULT_CACHE_CAPACITY: usize = 8192;

/// Identity of a logical fetch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Session the fetch was issued from
    pub session: u64,

    /// URL as passed to the downloader
    pub url: String,

    /// GET or HEAD
    pub mode: FetchMode,

    /// Whether the fetch was routed through the proxy pool
    pub use_proxy: bool,

    /// Retry counter at the time of the call
    pub retries: u32,
}

impl CacheKey {
    pub fn new(session: u64, url: &str, mode: FetchMode, use_proxy: bool, retries: u32) -> Self {
        Self {
            session,
            url: url.to_string(),
            mode,
            use_proxy,
            retries,
        }
    }
}

/// Process- or run-scoped cache of fetch outcomes
///
/// A `None` value is the permanent-failure sentinel.
pub struct FetchCache {
    entries: Mutex<LruCache<CacheKey, Option<FetchResponse>>>,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a cache holding at most `capacity` entries (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Looks up a key; the outer `Option` is a miss, the inner one the result
    pub fn get(&self, key: &CacheKey) -> Option<Option<FetchResponse>> {
        self.lock().get(key).cloned()
    }

    /// Records the outcome for a key, keeping the first one stored
    ///
    /// When the cache is full the least recently used entry is evicted.
    pub fn insert(&self, key: CacheKey, result: Option<FetchResponse>) {
        let mut entries = self.lock();
        if !entries.contains(&key) {
            entries.put(key, result);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every entry
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<CacheKey, Option<FetchResponse>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for FetchCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FetchCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.lock();
        f.debug_struct("FetchCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}

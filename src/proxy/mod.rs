//! Proxy pool management
//!
//! The [`ProxyManager`] hands out the current proxy for proxied fetches and
//! advances to the next one when a fetch through it fails. State is kept
//! behind a single mutex so concurrent workers see a coherent rotation.

use std::sync::Mutex;

/// A proxy endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyDescriptor {
    /// Proxy URL, e.g. `http://10.0.0.1:3128`
    pub url: String,
}

impl ProxyDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// The proxy currently selected by the manager
///
/// `index` is `-1` and `proxy` is `None` when the pool is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySelection {
    pub proxy: Option<ProxyDescriptor>,
    pub index: i64,
}

impl ProxySelection {
    fn unavailable() -> Self {
        Self {
            proxy: None,
            index: -1,
        }
    }
}

#[derive(Debug)]
struct RotationState {
    current: usize,
    last_failed: Option<usize>,
}

/// Rotating pool of proxies shared by all downloads of a crawl run
#[derive(Debug)]
pub struct ProxyManager {
    pool: Vec<ProxyDescriptor>,
    state: Mutex<RotationState>,
}

impl ProxyManager {
    /// Creates a manager over the given pool, starting at the first entry
    pub fn new(pool: Vec<ProxyDescriptor>) -> Self {
        Self {
            pool,
            state: Mutex::new(RotationState {
                current: 0,
                last_failed: None,
            }),
        }
    }

    /// Creates a manager with no proxies; every selection is unavailable
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Number of proxies in the pool
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Returns true if the pool has no proxies
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Returns the current selection without changing it
    pub fn get_proxy(&self) -> ProxySelection {
        if self.pool.is_empty() {
            return ProxySelection::unavailable();
        }

        let state = self.lock();
        ProxySelection {
            proxy: Some(self.pool[state.current].clone()),
            index: state.current as i64,
        }
    }

    /// Advances past `failed_index` to the next proxy in the pool
    ///
    /// The new current index is `(failed_index + 1) mod len`, so two workers
    /// that failed on the same proxy both land on the same successor instead
    /// of skipping one. The failed index is remembered for diagnostics only;
    /// it stays in the rotation.
    pub fn change_proxy(&self, failed_index: i64) {
        if self.pool.is_empty() || failed_index < 0 {
            return;
        }

        let failed = failed_index as usize % self.pool.len();
        let mut state = self.lock();
        state.last_failed = Some(failed);
        state.current = (failed + 1) % self.pool.len();

        tracing::debug!(
            "Proxy {} failed, rotating to {}",
            self.pool[failed].url,
            self.pool[state.current].url
        );
    }

    /// Index of the most recently failed proxy, if any
    pub fn last_failed(&self) -> Option<usize> {
        self.lock().last_failed
    }

    /// Returns the rotation to the first proxy and forgets failures
    pub fn reset(&self) {
        let mut state = self.lock();
        state.current = 0;
        state.last_failed = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RotationState> {
        // The state is two integers; a panic mid-update cannot leave it torn
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ProxyManager {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pool(n: usize) -> ProxyManager {
        ProxyManager::new(
            (0..n)
                .map(|i| ProxyDescriptor::new(format!("http://10.0.0.{}:3128", i)))
                .collect(),
        )
    }

    #[test]
    fn test_empty_pool_is_unavailable() {
        let manager = ProxyManager::empty();
        for _ in 0..3 {
            let selection = manager.get_proxy();
            assert_eq!(selection.proxy, None);
            assert_eq!(selection.index, -1);
        }
    }

    #[test]
    fn test_change_proxy_on_empty_pool_is_noop() {
        let manager = ProxyManager::empty();
        manager.change_proxy(0);
        assert_eq!(manager.get_proxy().index, -1);
        assert_eq!(manager.last_failed(), None);
    }

    #[test]
    fn test_starts_at_first_proxy() {
        let manager = pool(3);
        let selection = manager.get_proxy();
        assert_eq!(selection.index, 0);
        assert_eq!(selection.proxy.unwrap().url, "http://10.0.0.0:3128");
    }

    #[test]
    fn test_get_proxy_does_not_rotate() {
        let manager = pool(3);
        manager.get_proxy();
        manager.get_proxy();
        assert_eq!(manager.get_proxy().index, 0);
    }

    #[test]
    fn test_change_proxy_advances_and_wraps() {
        let manager = pool(3);
        for i in 0..7i64 {
            manager.change_proxy(i % 3);
            assert_eq!(manager.get_proxy().index, (i % 3 + 1) % 3);
        }
    }

    #[test]
    fn test_single_proxy_pool_wraps_to_itself() {
        let manager = pool(1);
        manager.change_proxy(0);
        assert_eq!(manager.get_proxy().index, 0);
        assert_eq!(manager.last_failed(), Some(0));
    }

    #[test]
    fn test_last_failed_recorded() {
        let manager = pool(4);
        manager.change_proxy(2);
        assert_eq!(manager.last_failed(), Some(2));
        assert_eq!(manager.get_proxy().index, 3);
    }

    #[test]
    fn test_negative_index_ignored() {
        let manager = pool(2);
        manager.change_proxy(-1);
        assert_eq!(manager.get_proxy().index, 0);
        assert_eq!(manager.last_failed(), None);
    }

    #[test]
    fn test_reset() {
        let manager = pool(3);
        manager.change_proxy(1);
        manager.reset();
        assert_eq!(manager.get_proxy().index, 0);
        assert_eq!(manager.last_failed(), None);
    }

    #[test]
    fn test_racing_failures_on_same_proxy_agree() {
        let manager = Arc::new(pool(5));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || manager.change_proxy(2))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(manager.get_proxy().index, 3);
    }
}

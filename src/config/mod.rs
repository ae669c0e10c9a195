//! Configuration module for Sumi-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, ProxyEntry};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

pub use validation::validate;

use crate::crawler::DownloaderConfig;
use crate::proxy::{ProxyDescriptor, ProxyManager};
use std::time::Duration;

impl CrawlerConfig {
    /// Downloader settings described by this section
    pub fn downloader_config(&self) -> DownloaderConfig {
        DownloaderConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            user_agent: self.user_agent.clone(),
            cache_capacity: self.cache_capacity,
        }
    }
}

impl Config {
    /// Builds the rotation pool from the `[[proxy]]` entries, in file order
    pub fn proxy_manager(&self) -> ProxyManager {
        ProxyManager::new(
            self.proxy
                .iter()
                .map(|entry| ProxyDescriptor::new(entry.url.clone()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downloader_config_from_section() {
        let config = parse_config(
            "[crawler]\ntimeout-secs = 5\nmax-retries = 1\ncache-capacity = 64\n",
        )
        .unwrap();
        let downloader = config.crawler.downloader_config();
        assert_eq!(downloader.timeout, Duration::from_secs(5));
        assert_eq!(downloader.max_retries, 1);
        assert_eq!(downloader.cache_capacity, 64);
    }

    #[test]
    fn test_proxy_manager_keeps_order() {
        let config = parse_config(
            "[[proxy]]\nurl = \"http://10.0.0.1:3128\"\n\n[[proxy]]\nurl = \"http://10.0.0.2:3128\"\n",
        )
        .unwrap();
        let manager = config.proxy_manager();
        assert_eq!(manager.len(), 2);

        let first = manager.get_proxy();
        assert_eq!(first.index, 0);
        assert_eq!(
            first.proxy.map(|p| p.url),
            Some("http://10.0.0.1:3128".to_string())
        );
    }
}

use serde::Deserialize;

/// Main configuration structure for Sumi-Harvest
///
/// Every section and key is optional; command-line flags override whatever
/// the file sets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub proxy: Vec<ProxyEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrawlerConfig {
    /// Maximum link depth from the seed URL
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Fetch method: "normal" or "browser"
    pub method: String,

    /// WebDriver binary used by the browser method
    #[serde(rename = "driver-path")]
    pub driver_path: String,

    /// Whether to fetch pages on hosts other than the seed's
    #[serde(rename = "follow-foreign-hosts")]
    pub follow_foreign_hosts: bool,

    /// Number of concurrent page workers
    pub workers: usize,

    /// Route every fetch through the proxy pool
    #[serde(rename = "use-proxy")]
    pub use_proxy: bool,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Retries after the first failed attempt
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// User agent header value
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Fetch outcomes remembered per run
    #[serde(rename = "cache-capacity")]
    pub cache_capacity: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            method: "normal".to_string(),
            driver_path: "geckodriver".to_string(),
            follow_foreign_hosts: false,
            workers: 1,
            use_proxy: false,
            timeout_secs: crate::crawler::DEFAULT_TIMEOUT.as_secs(),
            max_retries: crate::crawler::DEFAULT_MAX_RETRIES,
            user_agent: crate::crawler::DEFAULT_USER_AGENT.to_string(),
            cache_capacity: crate::crawler::DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory receiving the CSV ledger, stored files and log file
    #[serde(rename = "output-dir")]
    pub output_dir: String,

    /// Name for the ledger and storage subdirectory (default: seed host)
    #[serde(rename = "page-name")]
    pub page_name: Option<String>,

    /// Mirror log lines to `<output-dir>/_crawl.log`
    #[serde(rename = "use-logfile")]
    pub use_logfile: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: "./harvest".to_string(),
            page_name: None,
            use_logfile: true,
        }
    }
}

/// A proxy endpoint in the rotation pool
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyEntry {
    /// Proxy URL, e.g. "http://10.0.0.1:3128"
    pub url: String,
}

use crate::config::types::{Config, CrawlerConfig, OutputConfig, ProxyEntry};
use crate::crawler::CrawlMethod;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_proxies(&config.proxy)?;

    if config.crawler.use_proxy && config.proxy.is_empty() {
        return Err(ConfigError::Validation(
            "use-proxy is set but no [[proxy]] entries are configured".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth >= 0 is always true for u32, so no check needed

    config.method.parse::<CrawlMethod>()?;

    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.cache_capacity < 1 {
        return Err(ConfigError::Validation(
            "cache-capacity must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "output-dir cannot be empty".to_string(),
        ));
    }

    if let Some(name) = &config.page_name {
        validate_page_name(name)?;
    }

    Ok(())
}

/// A page name becomes a file name and a directory name
fn validate_page_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(ConfigError::Validation(format!(
            "page-name '{}' is not a usable file name",
            name
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(ConfigError::Validation(format!(
            "page-name '{}' cannot contain path separators",
            name
        )));
    }

    Ok(())
}

/// Validates proxy pool entries
fn validate_proxies(proxies: &[ProxyEntry]) -> Result<(), ConfigError> {
    for entry in proxies {
        validate_proxy_url(&entry.url)?;
    }
    Ok(())
}

/// Proxy URLs must be absolute http(s) URLs with a host
fn validate_proxy_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy URL '{}': {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Proxy URL '{}' must use the http or https scheme",
            raw
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Proxy URL '{}' has no host",
            raw
        )));
    }

    Ok(())
}

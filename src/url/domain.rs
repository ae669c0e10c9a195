use url::Url;

/// Extracts the host from a URL string
///
/// The host is converted to lowercase and the port is dropped. Returns `None`
/// if the string does not parse or has no host.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::extract_host;
///
/// assert_eq!(extract_host("https://EXAMPLE.com:8080/a"), Some("example.com".to_string()));
/// assert_eq!(extract_host("not a url"), None);
/// ```
pub fn extract_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|h| h.to_lowercase())
}

/// Extracts the network location (host plus explicit port) from a URL string
///
/// ```
/// use sumi_harvest::url::extract_netloc;
///
/// assert_eq!(extract_netloc("http://a.com:8080/x"), Some("a.com:8080".to_string()));
/// assert_eq!(extract_netloc("http://a.com/x"), Some("a.com".to_string()));
/// ```
pub fn extract_netloc(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Returns true if both URLs parse and share the same host
pub fn same_host(a: &str, b: &str) -> bool {
    match (extract_host(a), extract_host(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

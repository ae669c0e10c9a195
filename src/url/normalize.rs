/// Scheme used when a URL is written without one
const DEFAULT_SCHEME: &str = "http";

/// Normalizes a URL string according to Sumi-Harvest's normalization rules
///
/// # Normalization Steps
///
/// 1. Add the `http` scheme if none is present (`a.com/x` → `http://a.com/x`)
/// 2. Remove the fragment (everything from the first `#`)
/// 3. Remove one trailing slash (`http://a.com/x/` → `http://a.com/x`)
///
/// Host case, query parameter order and default ports are left as they are,
/// so `http://A.com/x` and `http://a.com/x` are different keys.
///
/// The function never fails. It is idempotent for every input that does not
/// end in repeated slashes; `http://a.com/x//` loses one slash per call.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::normalize;
///
/// assert_eq!(normalize("http://a.com/x/#frag"), "http://a.com/x");
/// assert_eq!(normalize("a.com/x/"), "http://a.com/x");
/// ```
pub fn normalize(url: &str) -> String {
    let url = url.trim();

    // Step 1: Add scheme if missing
    let mut normalized = if has_scheme(url) {
        url.to_string()
    } else {
        let rest = url.strip_prefix("//").unwrap_or(url);
        format!("{}://{}", DEFAULT_SCHEME, rest)
    };

    // Step 2: Remove fragment
    if let Some(pos) = normalized.find('#') {
        normalized.truncate(pos);
    }

    // Step 3: Remove one trailing slash, never touching the "://" separator
    let body_start = normalized.find("://").map(|i| i + 3).unwrap_or(0);
    if normalized.len() > body_start + 1 && normalized.ends_with('/') {
        normalized.pop();
    }

    normalized
}

/// Checks whether a URL string starts with a scheme
///
/// `a.com:8080/x` is treated as scheme-less, since what follows the colon is
/// a port number rather than the scheme-specific part.
fn has_scheme(url: &str) -> bool {
    let Some(colon) = url.find(':') else {
        return false;
    };

    let scheme = &url[..colon];
    let mut chars = scheme.chars();
    let valid_token = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        }
        _ => false,
    };
    if !valid_token {
        return false;
    }

    let rest = &url[colon + 1..];
    if rest.starts_with("//") {
        return true;
    }

    // "host:port" has only digits up to the next path separator
    let port: &str = rest.split(['/', '?', '#']).next().unwrap_or("");
    port.is_empty() || !port.chars().all(|c| c.is_ascii_digit())
}

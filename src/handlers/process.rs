use super::traits::ProcessHandler;
use crate::url::extract_host;

/// Accepts every link with an `http` or `https` scheme
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProcessHandler;

impl ProcessHandler for DefaultProcessHandler {
    fn accept(&self, link: &str) -> bool {
        let lowered = link.to_ascii_lowercase();
        lowered.starts_with("http://") || lowered.starts_with("https://")
    }
}

/// Accepts HTTP(S) links on one host only
#[derive(Debug, Clone)]
pub struct SameHostProcessHandler {
    host: String,
}

impl SameHostProcessHandler {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into().to_lowercase(),
        }
    }
}

impl ProcessHandler for SameHostProcessHandler {
    fn accept(&self, link: &str) -> bool {
        DefaultProcessHandler.accept(link)
            && extract_host(link).is_some_and(|host| host == self.host)
    }
}

impl<F> ProcessHandler for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn accept(&self, link: &str) -> bool {
        self(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_accepts_http_schemes() {
        let handler = DefaultProcessHandler;
        assert!(handler.accept("http://a.com/x"));
        assert!(handler.accept("HTTPS://a.com/x"));
        assert!(!handler.accept("ftp://a.com/x"));
        assert!(!handler.accept("mailto:a@a.com"));
    }

    #[test]
    fn test_same_host() {
        let handler = SameHostProcessHandler::new("A.com");
        assert!(handler.accept("http://a.com/x.pdf"));
        assert!(!handler.accept("http://b.com/x.pdf"));
        assert!(!handler.accept("ftp://a.com/x.pdf"));
    }

    #[test]
    fn test_closure_handler() {
        let only_pdfs = |link: &str| link.ends_with(".pdf");
        assert!(only_pdfs.accept("http://a.com/x.pdf"));
        assert!(!ProcessHandler::accept(&only_pdfs, "http://a.com/x.html"));
    }
}

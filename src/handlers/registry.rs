use super::traits::{GetHandler, HeadHandler};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Dispatch table mapping content types to handlers
///
/// Content types are matched case-insensitively on the media type alone
/// (`application/pdf`, not `application/pdf; q=1`). A missing entry means
/// "not interested".
#[derive(Clone, Default)]
pub struct HandlerTable {
    head: BTreeMap<String, Arc<dyn HeadHandler>>,
    get: BTreeMap<String, Arc<dyn GetHandler>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a HEAD handler, replacing any previous one for the type
    pub fn register_head(&mut self, content_type: impl AsRef<str>, handler: Arc<dyn HeadHandler>) {
        self.head.insert(key(content_type.as_ref()), handler);
    }

    /// Registers a GET handler, replacing any previous one for the type
    pub fn register_get(&mut self, content_type: impl AsRef<str>, handler: Arc<dyn GetHandler>) {
        self.get.insert(key(content_type.as_ref()), handler);
    }

    /// Builder-style [`register_head`](Self::register_head)
    pub fn with_head(mut self, content_type: impl AsRef<str>, handler: Arc<dyn HeadHandler>) -> Self {
        self.register_head(content_type, handler);
        self
    }

    /// Builder-style [`register_get`](Self::register_get)
    pub fn with_get(mut self, content_type: impl AsRef<str>, handler: Arc<dyn GetHandler>) -> Self {
        self.register_get(content_type, handler);
        self
    }

    pub fn head_handler(&self, content_type: &str) -> Option<&Arc<dyn HeadHandler>> {
        self.head.get(&key(content_type))
    }

    pub fn get_handler(&self, content_type: &str) -> Option<&Arc<dyn GetHandler>> {
        self.get.get(&key(content_type))
    }

    pub fn has_get_handler(&self, content_type: &str) -> bool {
        self.get.contains_key(&key(content_type))
    }

    /// Content types with a HEAD handler, in sorted order
    pub fn head_types(&self) -> impl Iterator<Item = &str> {
        self.head.keys().map(String::as_str)
    }

    /// Content types with a GET handler, in sorted order
    pub fn get_types(&self) -> impl Iterator<Item = &str> {
        self.get.keys().map(String::as_str)
    }

    /// Returns true if no handler of either kind is registered
    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.get.is_empty()
    }
}

fn key(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

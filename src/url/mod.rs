//! URL handling module for Sumi-Harvest
//!
//! This module provides the string-level URL normalization used as the
//! frontier key, and host extraction for host-scoped crawls.

mod domain;
mod normalize;

pub use domain::{extract_host, extract_netloc, same_host};
pub use normalize::normalize;

/// Returns true if a normalized URL lies on the given seed network location
///
/// `seed_netloc` is host plus explicit port, as returned by
/// [`extract_netloc`]. A different port is a different site. URLs without a
/// parsable host are never in scope.
pub fn in_scope(url: &str, seed_netloc: &str) -> bool {
    extract_netloc(url).is_some_and(|netloc| netloc == seed_netloc)
}

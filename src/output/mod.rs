//! Post-crawl output utilities
//!
//! Stored files carry UUID names; this module turns the CSV ledgers back
//! into a human-readable file layout.

mod layout;

pub use layout::{generate_layout_script, LayoutMode};

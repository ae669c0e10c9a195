//! Content handlers
//!
//! This module holds the capability interfaces the crawler dispatches to and
//! the built-in implementations:
//! - [`CsvStatsHandler`]: HEAD handler writing one CSV row per document
//! - [`LocalStorageHandler`]: GET handler storing bodies on disk
//! - [`DefaultProcessHandler`]: link filter accepting HTTP(S) links

mod csv_stats;
mod layout;
mod local_storage;
mod process;
mod registry;
mod traits;

pub use csv_stats::{document_filename, CsvStatsHandler, CSV_HEADER};
pub use layout::StorageLayout;
pub use local_storage::LocalStorageHandler;
pub use process::{DefaultProcessHandler, SameHostProcessHandler};
pub use registry::HandlerTable;
pub use traits::{GetHandler, HandlerError, HandlerResult, HeadHandler, HeadOutcome, ProcessHandler};

/// Content type of the documents harvested by default
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Content type whose bodies are inspected for links
pub const HTML_CONTENT_TYPE: &str = "text/html";

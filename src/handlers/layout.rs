use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Where harvested files of one crawl land on disk
///
/// Files are stored as `<output_dir>/<page_name>/<uuid>.<extension>`. The
/// UUID is derived from the URL (v5, URL namespace), so the HEAD-side
/// recorder knows the local name before the GET-side store writes it, and a
/// re-run maps the same URL to the same file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    output_dir: PathBuf,
    page_name: String,
    extension: String,
}

impl StorageLayout {
    pub fn new(output_dir: impl Into<PathBuf>, page_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            page_name: page_name.into(),
            extension: "pdf".to_string(),
        }
    }

    /// Uses a different file extension (without the dot)
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn page_name(&self) -> &str {
        &self.page_name
    }

    /// Directory holding the stored files
    pub fn storage_dir(&self) -> PathBuf {
        self.output_dir.join(&self.page_name)
    }

    /// Path of the CSV ledger for this page
    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.csv", self.page_name))
    }

    /// Local path for a URL's body
    pub fn local_path(&self, url: &str) -> PathBuf {
        let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, url.as_bytes());
        self.storage_dir()
            .join(format!("{}.{}", id.hyphenated(), self.extension))
    }
}

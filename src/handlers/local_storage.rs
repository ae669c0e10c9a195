use super::layout::StorageLayout;
use super::traits::{GetHandler, HandlerResult};
use crate::crawler::FetchResponse;
use std::fs;

/// GET handler that stores response bodies on the local filesystem
///
/// Bodies are written to [`StorageLayout::local_path`], creating the
/// storage directory on first use.
pub struct LocalStorageHandler {
    layout: StorageLayout,
}

impl LocalStorageHandler {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }
}

impl GetHandler for LocalStorageHandler {
    fn on_get(&self, url: &str, response: &FetchResponse) -> HandlerResult<()> {
        let path = self.layout.local_path(url);
        fs::create_dir_all(self.layout.storage_dir())?;
        fs::write(&path, &response.body)?;

        tracing::info!(
            "Stored {} ({} bytes) at {}",
            url,
            response.body.len(),
            path.display()
        );
        Ok(())
    }
}

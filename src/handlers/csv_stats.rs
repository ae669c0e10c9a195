//! CSV ledger of harvested documents
//!
//! [`CsvStatsHandler`] is a HEAD handler that appends one row per newly seen
//! document to `<output_dir>/<page_name>.csv`. Rows already present in the
//! ledger from an earlier run are loaded at startup; for those the handler
//! vetoes the GET when the stored file is still on disk.

use super::layout::StorageLayout;
use super::traits::{HandlerResult, HeadHandler, HeadOutcome};
use crate::crawler::FetchResponse;
use percent_encoding::percent_decode_str;
use reqwest::header::CONTENT_DISPOSITION;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::sync::Mutex;
use url::Url;

/// Column names of the ledger, in order
pub const CSV_HEADER: [&str; 6] = [
    "filename",
    "local_name",
    "url",
    "content_length",
    "last_modified",
    "recorded_at",
];

const URL_COLUMN: usize = 2;

struct Ledger {
    writer: csv::Writer<File>,
    recorded: HashSet<String>,
}

/// HEAD handler that records document metadata to a CSV file
pub struct CsvStatsHandler {
    layout: StorageLayout,
    ledger: Mutex<Ledger>,
}

impl CsvStatsHandler {
    /// Opens (or creates) the ledger for a storage layout
    ///
    /// Creates the output directory if needed and writes the header row to a
    /// new or empty file.
    pub fn new(layout: StorageLayout) -> HandlerResult<Self> {
        fs::create_dir_all(layout.output_dir())?;
        let path = layout.csv_path();

        let recorded = if path.exists() {
            load_recorded_urls(&path)?
        } else {
            HashSet::new()
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let is_empty = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_empty {
            writer.write_record(CSV_HEADER)?;
            writer.flush()?;
        }

        tracing::debug!(
            "Opened ledger {} with {} recorded documents",
            path.display(),
            recorded.len()
        );

        Ok(Self {
            layout,
            ledger: Mutex::new(Ledger { writer, recorded }),
        })
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Number of documents in the ledger
    pub fn recorded_count(&self) -> usize {
        self.lock().recorded.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.ledger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl HeadHandler for CsvStatsHandler {
    fn on_head(&self, url: &str, response: &FetchResponse) -> HandlerResult<HeadOutcome> {
        let local_path = self.layout.local_path(url);
        let mut ledger = self.lock();

        if ledger.recorded.contains(url) {
            if local_path.exists() {
                tracing::info!("Already harvested {}, skipping download", url);
                return Ok(HeadOutcome::Skip);
            }
            // Recorded by an earlier run whose download never landed
            return Ok(HeadOutcome::Continue);
        }

        let filename = document_filename(url, response);
        let local_name = local_path.to_string_lossy().into_owned();
        let content_length = response
            .content_length()
            .map(|len| len.to_string())
            .unwrap_or_default();
        let last_modified = response.last_modified().unwrap_or_default().to_string();
        let recorded_at = chrono::Utc::now().to_rfc3339();

        ledger.writer.write_record([
            filename.as_str(),
            local_name.as_str(),
            url,
            content_length.as_str(),
            last_modified.as_str(),
            recorded_at.as_str(),
        ])?;
        ledger.writer.flush()?;
        ledger.recorded.insert(url.to_string());

        tracing::info!("Recorded {} as {}", url, filename);
        Ok(HeadOutcome::Continue)
    }
}

/// Reads the URL column of an existing ledger
fn load_recorded_urls(path: &std::path::Path) -> HandlerResult<HashSet<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut urls = HashSet::new();
    for record in reader.records() {
        let record = record?;
        if let Some(url) = record.get(URL_COLUMN) {
            urls.insert(url.to_string());
        }
    }
    Ok(urls)
}

/// Picks a human-readable file name for a document
///
/// Prefers the `filename` parameter of Content-Disposition, then the last
/// non-empty path segment of the URL (percent-decoded), then the host.
pub fn document_filename(url: &str, response: &FetchResponse) -> String {
    if let Some(name) = response
        .headers
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(content_disposition_filename)
    {
        return name;
    }

    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };

    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        .or_else(|| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

fn content_disposition_filename(value: &str) -> Option<String> {
    value.split(';').find_map(|part| {
        let (key, raw) = part.trim().split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let name = raw.trim().trim_matches('"').trim();
        (!name.is_empty()).then(|| name.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use reqwest::header::HeaderMap;
    use tempfile::TempDir;

    fn head_response(headers: &[(&'static str, &'static str)]) -> FetchResponse {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, value.parse().unwrap());
        }
        FetchResponse {
            url: "http://example.com/docs/report.pdf".to_string(),
            status: 200,
            headers: map,
            body: Bytes::new(),
        }
    }

    fn read_rows(path: &std::path::Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_new_ledger_has_header() {
        let dir = TempDir::new().unwrap();
        let layout = StorageLayout::new(dir.path(), "example.com");
        let handler = CsvStatsHandler::new(layout.clone()).unwrap();
        drop(handler);

        let rows = read_rows(&layout.csv_path());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], CSV_HEADER.map(str::to_string).to_vec());
    }

    #[test]
    fn test_records_one_row_per_document() {
        let dir = TempDir::new().unwrap();
        let layout = StorageLayout::new(dir.path(), "example.com");
        let handler = CsvStatsHandler::new(layout.clone()).unwrap();
        let response = head_response(&[
            ("content-type", "application/pdf"),
            ("content-length", "2048"),
            ("last-modified", "Wed, 21 Oct 2015 07:28:00 GMT"),
        ]);

        let url = "http://example.com/docs/report.pdf";
        assert_eq!(handler.on_head(url, &response).unwrap(), HeadOutcome::Continue);
        assert_eq!(handler.on_head(url, &response).unwrap(), HeadOutcome::Continue);

        let rows = read_rows(&layout.csv_path());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "report.pdf");
        assert_eq!(rows[1][1], layout.local_path(url).to_string_lossy());
        assert_eq!(rows[1][2], url);
        assert_eq!(rows[1][3], "2048");
        assert_eq!(rows[1][4], "Wed, 21 Oct 2015 07:28:00 GMT");
        assert!(!rows[1][5].is_empty());
        assert_eq!(handler.recorded_count(), 1);
    }

    #[test]
    fn test_reopen_skips_harvested_documents() {
        let dir = TempDir::new().unwrap();
        let layout = StorageLayout::new(dir.path(), "example.com");
        let url = "http://example.com/docs/report.pdf";
        let response = head_response(&[]);

        {
            let handler = CsvStatsHandler::new(layout.clone()).unwrap();
            handler.on_head(url, &response).unwrap();
        }

        // Row exists but the file was never stored
        let handler = CsvStatsHandler::new(layout.clone()).unwrap();
        assert_eq!(handler.recorded_count(), 1);
        assert_eq!(handler.on_head(url, &response).unwrap(), HeadOutcome::Continue);

        // Once stored, the download is vetoed
        let local = layout.local_path(url);
        fs::create_dir_all(local.parent().unwrap()).unwrap();
        fs::write(&local, b"%PDF-1.4").unwrap();
        assert_eq!(handler.on_head(url, &response).unwrap(), HeadOutcome::Skip);

        // Header is not written twice
        let rows = read_rows(&layout.csv_path());
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_filename_from_content_disposition() {
        let response = head_response(&[(
            "content-disposition",
            "attachment; filename=\"Annual Report 2023.pdf\"",
        )]);
        assert_eq!(
            document_filename("http://example.com/download?id=7", &response),
            "Annual Report 2023.pdf"
        );
    }

    #[test]
    fn test_filename_from_path() {
        let response = head_response(&[]);
        assert_eq!(
            document_filename("http://example.com/a/b/minutes.pdf", &response),
            "minutes.pdf"
        );
        assert_eq!(
            document_filename("http://example.com/a/b/", &response),
            "b"
        );
        assert_eq!(
            document_filename("http://example.com", &response),
            "example.com"
        );
    }

    #[test]
    fn test_filename_is_percent_decoded() {
        let response = head_response(&[]);
        assert_eq!(
            document_filename("http://example.com/docs/Annual%20Report.pdf", &response),
            "Annual Report.pdf"
        );
        assert_eq!(
            document_filename("http://example.com/docs/%C3%BCbersicht.pdf", &response),
            "übersicht.pdf"
        );
        // Invalid UTF-8 is replaced rather than rejected
        assert_eq!(
            document_filename("http://example.com/docs/bad%FF.pdf", &response),
            "bad\u{FFFD}.pdf"
        );
    }
}

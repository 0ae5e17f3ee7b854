//! End-to-end online run: search, download, then extract, one file type at a time.

use std::path::Path;

use tracing::{info, warn};

use crate::download::Downloader;
use crate::models::{ExtractionResult, FileType, ScanResults};
use crate::processing::ResultProcessor;
use crate::search::{SearchEngine, SearchError};

/// Per-file-type caps for an online run.
#[derive(Debug, Clone, Copy)]
pub struct RunLimits {
    pub search_limit: usize,
    /// Zero downloads every result.
    pub download_limit: usize,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            search_limit: 200,
            download_limit: 50,
        }
    }
}

/// Progress notifications from [`run_online`].
#[derive(Debug)]
pub enum RunEvent<'a> {
    SearchStarted { file_type: FileType },
    SearchFailed { file_type: FileType, error: &'a SearchError },
    SearchCompleted { file_type: FileType, results: usize },
    DownloadStarted { file_type: FileType, total: usize },
    DownloadsCompleted { file_type: FileType, succeeded: usize, total: usize },
    FileProcessed { path: &'a Path, result: &'a ExtractionResult },
}

/// Closes the search engine when dropped, whichever way the run ends.
struct CloseOnDrop<'a>(&'a dyn SearchEngine);

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Search `domain` for each file type in order, download each batch, then
/// extract the downloaded files sequentially.
///
/// A failed search skips its file type. Failed downloads are recorded as
/// failures keyed by URL.
pub async fn run_online(
    domain: &str,
    file_types: &[FileType],
    engine: &dyn SearchEngine,
    downloader: &Downloader,
    limits: RunLimits,
    on_event: &(dyn Fn(RunEvent<'_>) + Send + Sync),
) -> ScanResults {
    let _close = CloseOnDrop(engine);
    let mut processor = ResultProcessor::new(domain);

    for &file_type in file_types {
        on_event(RunEvent::SearchStarted { file_type });

        let results = match engine.search_files(file_type, limits.search_limit).await {
            Ok(results) => results,
            Err(error) => {
                warn!("No {} results for {}: {}", file_type, domain, error);
                on_event(RunEvent::SearchFailed {
                    file_type,
                    error: &error,
                });
                continue;
            }
        };
        on_event(RunEvent::SearchCompleted {
            file_type,
            results: results.len(),
        });
        if results.is_empty() {
            continue;
        }

        let urls: Vec<String> = results.into_iter().map(|r| r.url).collect();
        on_event(RunEvent::DownloadStarted {
            file_type,
            total: match limits.download_limit {
                0 => urls.len(),
                l => urls.len().min(l),
            },
        });
        let downloads = downloader
            .download_files(&urls, Some(limits.download_limit))
            .await;

        let succeeded = downloads.iter().filter(|d| d.is_success()).count();
        on_event(RunEvent::DownloadsCompleted {
            file_type,
            succeeded,
            total: downloads.len(),
        });

        for download in &downloads {
            match &download.local_path {
                Some(path) if download.is_success() => {
                    let result = processor.process_file(path, Some(&download.url));
                    on_event(RunEvent::FileProcessed {
                        path,
                        result: &result,
                    });
                }
                _ => {
                    let error = download.error.as_deref().unwrap_or("Download failed");
                    processor.record_download_failure(&download.url, error);
                }
            }
        }
    }

    let results = processor.into_results();
    info!(
        "Run against {} complete: {} documents, {} failures",
        domain,
        results.documents().len(),
        results.failed().len()
    );
    results
}

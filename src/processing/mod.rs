//! Extraction, enrichment and aggregation of processed documents.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::extractors::{extractor_for, ExtractionError, MetadataExtractor};
use crate::models::{DocumentMetadata, ExtractionResult, FileType, ScanResults};
use crate::text;

/// Owns the [`ScanResults`] of one run and is the only writer to it.
pub struct ResultProcessor {
    results: ScanResults,
}

impl ResultProcessor {
    /// Start an empty aggregate for `domain` (or a label for local scans).
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            results: ScanResults::new(domain),
        }
    }

    pub fn results(&self) -> &ScanResults {
        &self.results
    }

    pub fn into_results(self) -> ScanResults {
        self.results
    }

    /// Record a URL that never produced a local file.
    pub fn record_download_failure(&mut self, url: &str, message: &str) {
        self.results.record_failure(url, message);
    }

    /// Extract, enrich and record one file.
    pub fn process_file(&mut self, path: &Path, source_url: Option<&str>) -> ExtractionResult {
        let identifier = path.display().to_string();

        let Some(extractor) = extractor_for(path) else {
            let ext = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            let message = ExtractionError::UnsupportedFileType(ext).to_string();
            self.results.record_failure(identifier, message.clone());
            return ExtractionResult::Failure(message);
        };

        let mut metadata = match extractor.extract() {
            ExtractionResult::Success(metadata) => metadata,
            ExtractionResult::Failure(message) => {
                warn!("Extraction failed for {}: {}", identifier, message);
                self.results.record_failure(identifier, message.clone());
                return ExtractionResult::Failure(message);
            }
        };

        if let Some(url) = source_url {
            metadata.source_url = Some(url.to_string());
        }
        enrich(&mut metadata, extractor.as_ref());

        debug!(
            "Processed {}: {} users, {} emails, {} paths",
            identifier,
            metadata.users.len(),
            metadata.emails.len(),
            metadata.paths.len()
        );
        self.results.record_document(metadata.clone());
        ExtractionResult::Success(metadata)
    }

    /// Process every file directly inside `dir` with a recognised extension.
    ///
    /// Other files are skipped, not recorded as failures. Files are visited in
    /// name order. Returns the number of files processed.
    pub fn process_directory(&mut self, dir: &Path) -> io::Result<usize> {
        let paths = supported_files(dir)?;
        for path in &paths {
            self.process_file(path, None);
        }
        Ok(paths.len())
    }
}

/// Regular files directly inside `dir` with a recognised extension, sorted by name.
pub fn supported_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && FileType::from_path(&path).is_some() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Merge emails and paths mined from the document text into `metadata`.
fn enrich(metadata: &mut DocumentMetadata, extractor: &dyn MetadataExtractor) {
    let Some(body) = extractor.extract_text() else {
        return;
    };
    if body.is_empty() {
        return;
    }

    for email in text::extract_emails(&body) {
        metadata.add_email(&email);
    }
    for path in text::extract_paths(&body) {
        metadata.add_path(&path);
    }
}

//! Result types passed between the pipeline stages.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::DocumentMetadata;

/// Outcome of running a metadata extractor over one file.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    Success(DocumentMetadata),
    Failure(String),
}

impl ExtractionResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn metadata(&self) -> Option<&DocumentMetadata> {
        match self {
            Self::Success(meta) => Some(meta),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(msg) => Some(msg),
        }
    }
}

/// A candidate file URL returned by a search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: Option<String>,
}

impl SearchResult {
    pub fn new(url: impl Into<String>, title: Option<String>) -> Self {
        Self {
            url: url.into(),
            title: title.filter(|t| !t.is_empty()),
        }
    }
}

/// Outcome of fetching one URL.
///
/// Exactly one of `local_path` and `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResult {
    pub url: String,
    pub local_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl DownloadResult {
    pub fn success(url: impl Into<String>, local_path: PathBuf) -> Self {
        Self {
            url: url.into(),
            local_path: Some(local_path),
            error: None,
        }
    }

    pub fn failure(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            local_path: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.local_path.is_some()
    }
}

/// Summary counts for a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub total_documents: usize,
    pub failed_extractions: usize,
    pub unique_users: usize,
    pub unique_software: usize,
    pub unique_emails: usize,
    pub unique_paths: usize,
}

/// Aggregated results for one run against one domain (or a local directory).
///
/// Documents and failures are append-only; the unique indicator sets and the
/// statistics are derived on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResults {
    pub domain: String,
    documents: Vec<DocumentMetadata>,
    /// `(identifier, error message)` pairs; the identifier is a path or URL.
    failed: Vec<(String, String)>,
}

impl ScanResults {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            documents: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn documents(&self) -> &[DocumentMetadata] {
        &self.documents
    }

    pub fn failed(&self) -> &[(String, String)] {
        &self.failed
    }

    pub(crate) fn record_document(&mut self, metadata: DocumentMetadata) {
        self.documents.push(metadata);
    }

    pub(crate) fn record_failure(&mut self, identifier: impl Into<String>, message: impl Into<String>) {
        self.failed.push((identifier.into(), message.into()));
    }

    pub fn unique_users(&self) -> Vec<String> {
        self.collect_unique(|doc| &doc.users)
    }

    pub fn unique_software(&self) -> Vec<String> {
        self.collect_unique(|doc| &doc.software)
    }

    pub fn unique_emails(&self) -> Vec<String> {
        self.collect_unique(|doc| &doc.emails)
    }

    pub fn unique_paths(&self) -> Vec<String> {
        self.collect_unique(|doc| &doc.paths)
    }

    pub fn stats(&self) -> ScanStats {
        ScanStats {
            total_documents: self.documents.len(),
            failed_extractions: self.failed.len(),
            unique_users: self.unique_users().len(),
            unique_software: self.unique_software().len(),
            unique_emails: self.unique_emails().len(),
            unique_paths: self.unique_paths().len(),
        }
    }

    fn collect_unique<F>(&self, field: F) -> Vec<String>
    where
        F: Fn(&DocumentMetadata) -> &Vec<String>,
    {
        self.documents
            .iter()
            .flat_map(|doc| field(doc).iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

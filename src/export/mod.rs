//! Report exporters.
//!
//! Both exporters render the same [`ScanReport`] shape: run metadata with
//! statistics, the deduplicated indicator summary, every document and every
//! failure.

mod html;
mod json;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::models::{DocumentMetadata, ScanResults, ScanStats};

pub use html::HtmlExporter;
pub use json::JsonExporter;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Output format of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Html,
}

impl ExportFormat {
    /// Pick the format from an output file extension; anything but `.json` is HTML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Html,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReportMeta<'a> {
    pub domain: &'a str,
    pub generated_at: DateTime<Utc>,
    pub stats: ScanStats,
}

#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub users: Vec<String>,
    pub software: Vec<String>,
    pub emails: Vec<String>,
    pub paths: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FailedEntry<'a> {
    pub file: &'a str,
    pub error: &'a str,
}

/// The exported view of a finished run.
#[derive(Debug, Serialize)]
pub struct ScanReport<'a> {
    pub meta: ReportMeta<'a>,
    pub summary: ReportSummary,
    pub documents: &'a [DocumentMetadata],
    pub failed: Vec<FailedEntry<'a>>,
}

impl<'a> ScanReport<'a> {
    pub fn new(results: &'a ScanResults, generated_at: DateTime<Utc>) -> Self {
        Self {
            meta: ReportMeta {
                domain: &results.domain,
                generated_at,
                stats: results.stats(),
            },
            summary: ReportSummary {
                users: results.unique_users(),
                software: results.unique_software(),
                emails: results.unique_emails(),
                paths: results.unique_paths(),
            },
            documents: results.documents(),
            failed: results
                .failed()
                .iter()
                .map(|(file, error)| FailedEntry { file, error })
                .collect(),
        }
    }
}

/// Write `results` to `path` in `format`.
pub fn export_to_file(
    results: &ScanResults,
    path: &Path,
    format: ExportFormat,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Json => JsonExporter.export(results, path),
        ExportFormat::Html => HtmlExporter.export(results, path),
    }
}

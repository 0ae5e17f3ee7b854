//! HTML report exporter.

use std::path::Path;

use askama::Template;
use chrono::Utc;

use super::ExportError;
use crate::models::{DocumentMetadata, ScanResults, ScanStats};

/// One row of the documents table.
pub struct DocumentRow {
    pub filename: String,
    pub file_type: String,
    pub source_url: String,
    pub users: String,
    pub software: String,
    pub created: String,
    pub modified: String,
}

impl From<&DocumentMetadata> for DocumentRow {
    fn from(doc: &DocumentMetadata) -> Self {
        let date = |dt: Option<chrono::DateTime<Utc>>| {
            dt.map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default()
        };
        Self {
            filename: doc.filename.clone(),
            file_type: doc.file_type.to_string(),
            source_url: doc.source_url.clone().unwrap_or_default(),
            users: doc.users.join(", "),
            software: doc.software.join(", "),
            created: date(doc.created),
            modified: date(doc.modified),
        }
    }
}

pub struct FailureRow {
    pub file: String,
    pub error: String,
}

#[derive(Template)]
#[template(path = "report.html")]
pub struct ReportTemplate {
    pub domain: String,
    pub generated_at: String,
    pub stats: ScanStats,
    pub users: Vec<String>,
    pub software: Vec<String>,
    pub emails: Vec<String>,
    pub paths: Vec<String>,
    pub documents: Vec<DocumentRow>,
    pub failed: Vec<FailureRow>,
}

impl ReportTemplate {
    pub fn new(results: &ScanResults) -> Self {
        Self {
            domain: results.domain.clone(),
            generated_at: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            stats: results.stats(),
            users: results.unique_users(),
            software: results.unique_software(),
            emails: results.unique_emails(),
            paths: results.unique_paths(),
            documents: results.documents().iter().map(DocumentRow::from).collect(),
            failed: results
                .failed()
                .iter()
                .map(|(file, error)| FailureRow {
                    file: file.clone(),
                    error: error.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlExporter;

impl HtmlExporter {
    pub fn export_string(&self, results: &ScanResults) -> Result<String, ExportError> {
        Ok(ReportTemplate::new(results).render()?)
    }

    pub fn export(&self, results: &ScanResults, path: &Path) -> Result<(), ExportError> {
        std::fs::write(path, self.export_string(results)?)?;
        Ok(())
    }
}

//! JSON report exporter.

use std::path::Path;

use chrono::Utc;

use super::{ExportError, ScanReport};
use crate::models::ScanResults;

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonExporter;

impl JsonExporter {
    /// Pretty-printed JSON report.
    pub fn export_string(&self, results: &ScanResults) -> Result<String, ExportError> {
        let report = ScanReport::new(results, Utc::now());
        Ok(serde_json::to_string_pretty(&report)?)
    }

    pub fn export(&self, results: &ScanResults, path: &Path) -> Result<(), ExportError> {
        std::fs::write(path, self.export_string(results)?)?;
        Ok(())
    }
}

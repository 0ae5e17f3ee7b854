//! Data models for metaharvest.

mod document;
mod results;

pub use document::{DocumentMetadata, FileType};
pub use results::{DownloadResult, ExtractionResult, ScanResults, ScanStats, SearchResult};

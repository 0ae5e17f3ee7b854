//! Metadata extractors for the supported document containers.
//!
//! Each extractor opens one file in its native container format, reads the
//! descriptive properties the producing application left behind, and
//! normalises them into [`DocumentMetadata`]. Extractors fail closed: any
//! parse problem becomes an [`ExtractionResult::Failure`], never a panic or
//! an error escaping [`MetadataExtractor::extract`].

mod legacy;
mod odf;
mod ooxml;
mod pdf;
pub mod values;
mod xml;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::models::{DocumentMetadata, ExtractionResult, FileType};

pub use legacy::LegacyOfficeExtractor;
pub use odf::OpenDocumentExtractor;
pub use ooxml::{DocxExtractor, PptxExtractor, XlsxExtractor};
pub use pdf::PdfExtractor;

/// Errors that can occur while reading a document container.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("{0}")]
    InvalidContainer(String),

    #[error("Document is encrypted")]
    Encrypted,

    #[error("Malformed property set: {0}")]
    PropertySet(String),

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("PDF parse error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A metadata extractor bound to one file.
///
/// Implementors provide the fallible readers; the provided `extract` and
/// `extract_text` methods turn them into the fail-closed public outcomes.
pub trait MetadataExtractor: Send + Sync {
    /// Path of the file this extractor reads.
    fn path(&self) -> &Path;

    /// Read and normalise the container's descriptive properties.
    fn read_metadata(&self) -> Result<DocumentMetadata, ExtractionError>;

    /// Read the document's plain text, if the format supports it.
    fn read_text(&self) -> Result<Option<String>, ExtractionError>;

    fn extract(&self) -> ExtractionResult {
        match self.read_metadata() {
            Ok(metadata) => ExtractionResult::Success(metadata),
            Err(e) => {
                debug!("Metadata extraction failed for {}: {}", self.path().display(), e);
                ExtractionResult::Failure(e.to_string())
            }
        }
    }

    /// Best-effort text for indicator mining. Failures yield `None`.
    fn extract_text(&self) -> Option<String> {
        match self.read_text() {
            Ok(text) => text,
            Err(e) => {
                debug!("Text extraction failed for {}: {}", self.path().display(), e);
                None
            }
        }
    }
}

/// The extractor families, one per container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    Pdf,
    OoxmlWord,
    OoxmlSheet,
    OoxmlSlide,
    LegacyOffice,
    OpenDocument,
}

impl ExtractorKind {
    /// The fixed file-type to extractor mapping.
    pub fn for_file_type(file_type: FileType) -> Self {
        match file_type {
            FileType::Pdf => Self::Pdf,
            FileType::Docx => Self::OoxmlWord,
            FileType::Xlsx => Self::OoxmlSheet,
            FileType::Pptx => Self::OoxmlSlide,
            FileType::Doc | FileType::Xls | FileType::Ppt => Self::LegacyOffice,
            FileType::Odt | FileType::Ods | FileType::Odp => Self::OpenDocument,
        }
    }

    /// Construct the extractor for a file of the given type.
    pub fn build(self, path: PathBuf, file_type: FileType) -> Box<dyn MetadataExtractor> {
        match self {
            Self::Pdf => Box::new(PdfExtractor::new(path)),
            Self::OoxmlWord => Box::new(DocxExtractor::new(path)),
            Self::OoxmlSheet => Box::new(XlsxExtractor::new(path)),
            Self::OoxmlSlide => Box::new(PptxExtractor::new(path)),
            Self::LegacyOffice => Box::new(LegacyOfficeExtractor::new(path, file_type)),
            Self::OpenDocument => Box::new(OpenDocumentExtractor::new(path, file_type)),
        }
    }
}

/// Select an extractor for a path by its (case-insensitive) extension.
///
/// Returns `None` for unrecognised extensions.
pub fn extractor_for(path: &Path) -> Option<Box<dyn MetadataExtractor>> {
    let file_type = FileType::from_path(path)?;
    Some(ExtractorKind::for_file_type(file_type).build(path.to_path_buf(), file_type))
}

/// Extract metadata from a file, reporting unsupported extensions as a failure.
pub fn extract_metadata(path: &Path) -> ExtractionResult {
    match extractor_for(path) {
        Some(extractor) => extractor.extract(),
        None => {
            let ext = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            ExtractionResult::failure(ExtractionError::UnsupportedFileType(ext).to_string())
        }
    }
}

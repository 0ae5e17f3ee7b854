//! PDF extractor backed by `lopdf`.

use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object};
use tracing::debug;

use super::values::{clean, decode_bytes, decode_utf16be, parse_pdf_date};
use super::{ExtractionError, MetadataExtractor};
use crate::models::{DocumentMetadata, FileType};
use crate::text;

const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

pub struct PdfExtractor {
    path: PathBuf,
}

impl PdfExtractor {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the document, opening owner-password-only files with the empty
    /// user password. Anything that needs a real password fails closed.
    fn load(&self) -> Result<Document, ExtractionError> {
        let mut doc = Document::load(&self.path)?;
        if doc.is_encrypted() {
            doc.decrypt("").map_err(|e| {
                debug!("Empty password rejected for {}: {}", self.path.display(), e);
                ExtractionError::Encrypted
            })?;
        }
        Ok(doc)
    }
}

/// Decode a PDF text string: UTF-16BE or UTF-8 with BOM, else the generic chain.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(UTF16BE_BOM) {
        decode_utf16be(rest)
    } else if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        String::from_utf8_lossy(rest).into_owned()
    } else {
        decode_bytes(bytes)
    }
}

/// String-coerce an Info value, following at most one indirect reference.
fn object_to_string(doc: &Document, obj: &Object) -> Option<String> {
    match obj {
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Reference(_) => None,
            inner => object_to_string(doc, inner),
        },
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        Object::Name(name) => Some(decode_bytes(name)),
        Object::Integer(n) => Some(n.to_string()),
        Object::Real(r) => Some(r.to_string()),
        Object::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn apply_info(metadata: &mut DocumentMetadata, doc: &Document, info: &Dictionary) {
    let field = |key: &[u8]| {
        info.get(key)
            .ok()
            .and_then(|obj| object_to_string(doc, obj))
            .and_then(|s| clean(&s))
    };

    if let Some(author) = field(b"Author") {
        metadata.add_user(&author);
        metadata.author = Some(author);
    }
    if let Some(creator) = field(b"Creator") {
        metadata.add_software(&creator);
        metadata.creator = Some(creator);
    }
    if let Some(producer) = field(b"Producer") {
        metadata.add_software(&producer);
        metadata.producer = Some(producer);
    }
    if let Some(title) = field(b"Title") {
        metadata.add_path_if_separated(&title);
    }
    // Subjects sometimes carry a contact address; only validated addresses are kept.
    if let Some(subject) = field(b"Subject").filter(|s| s.contains('@')) {
        for email in text::extract_emails(&subject) {
            metadata.add_email(&email);
        }
    }
    metadata.created = field(b"CreationDate").as_deref().and_then(parse_pdf_date);
    metadata.modified = field(b"ModDate").as_deref().and_then(parse_pdf_date);

    for (key, value) in info.iter() {
        if let Some(value) = object_to_string(doc, value) {
            metadata.set_raw(&String::from_utf8_lossy(key), value);
        }
    }
}

impl MetadataExtractor for PdfExtractor {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_metadata(&self) -> Result<DocumentMetadata, ExtractionError> {
        let doc = self.load()?;
        let mut metadata = DocumentMetadata::for_path(&self.path, FileType::Pdf);
        if let Some(info) = info_dictionary(&doc) {
            apply_info(&mut metadata, &doc, info);
        }
        Ok(metadata)
    }

    fn read_text(&self) -> Result<Option<String>, ExtractionError> {
        let doc = self.load()?;
        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        if pages.is_empty() {
            return Ok(None);
        }
        Ok(Some(doc.extract_text(&pages)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, StringFormat};

    fn literal(s: &str) -> Object {
        Object::String(s.as_bytes().to_vec(), StringFormat::Literal)
    }

    #[test]
    fn test_utf16_strings_with_bom_are_decoded() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "Jos\u{e9}".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_pdf_string(&bytes), "Jos\u{e9}");
        assert_eq!(decode_pdf_string(b"plain"), "plain");
    }

    #[test]
    fn test_info_dictionary_normalises_into_metadata() {
        let doc = Document::with_version("1.5");
        let info = dictionary! {
            "Author" => literal("J. Doe"),
            "Creator" => literal("Microsoft Word"),
            "Producer" => literal("Acrobat Distiller 9.0"),
            "Title" => literal("C:\\Users\\jdoe\\Desktop\\memo.doc"),
            "Subject" => literal("Contact: press@agency.gov"),
            "CreationDate" => literal("D:20230114093000+01'00'"),
        };
        let mut metadata = DocumentMetadata::new("memo.pdf", FileType::Pdf);
        apply_info(&mut metadata, &doc, &info);

        assert_eq!(metadata.users, vec!["J. Doe"]);
        assert_eq!(metadata.software, vec!["Microsoft Word", "Acrobat Distiller 9.0"]);
        assert_eq!(metadata.paths, vec!["C:\\Users\\jdoe\\Desktop\\memo.doc"]);
        assert_eq!(metadata.emails, vec!["press@agency.gov"]);
        assert!(metadata.created.is_some());
        assert_eq!(metadata.raw.get("Author").map(String::as_str), Some("J. Doe"));
        assert_eq!(metadata.raw.len(), 6);
    }

    #[test]
    fn test_subject_without_valid_address_adds_no_email() {
        let doc = Document::with_version("1.5");
        let info = dictionary! { "Subject" => literal("reach us @ the office") };
        let mut metadata = DocumentMetadata::new("a.pdf", FileType::Pdf);
        apply_info(&mut metadata, &doc, &info);
        assert!(metadata.emails.is_empty());
    }

    #[test]
    fn test_garbage_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4 but nothing else").unwrap();

        let extractor = PdfExtractor::new(path);
        assert!(!extractor.extract().is_success());
        assert!(extractor.extract_text().is_none());
    }
}

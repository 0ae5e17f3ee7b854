//! OpenDocument extractor (ODT, ODS, ODP).

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use zip::result::ZipError;
use zip::ZipArchive;

use super::values::{clean, decode_bytes, parse_xml_datetime};
use super::xml;
use super::{ExtractionError, MetadataExtractor};
use crate::models::{DocumentMetadata, FileType};

pub struct OpenDocumentExtractor {
    path: PathBuf,
    file_type: FileType,
}

impl OpenDocumentExtractor {
    pub fn new(path: PathBuf, file_type: FileType) -> Self {
        Self { path, file_type }
    }

    fn open(&self) -> Result<ZipArchive<File>, ExtractionError> {
        let file = File::open(&self.path)?;
        ZipArchive::new(file)
            .map_err(|_| ExtractionError::InvalidContainer("Not a valid OpenDocument file".into()))
    }
}

fn read_part(archive: &mut ZipArchive<File>, name: &str) -> Result<Option<String>, ExtractionError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut buf = Vec::new();
    entry.read_to_end(&mut buf)?;
    Ok(Some(decode_bytes(&buf)))
}

fn apply_meta(metadata: &mut DocumentMetadata, content: &str) -> Result<(), ExtractionError> {
    let els = xml::elements(content)?;

    let creator = xml::find_text(&els, "creator");
    let initial_creator = xml::find_text(&els, "initial-creator");
    let generator = xml::find_text(&els, "generator");
    let creation_date = xml::find_text(&els, "creation-date");
    let date = xml::find_text(&els, "date");
    let template = xml::find(&els, "template")
        .and_then(|t| t.attribute("href"))
        .and_then(clean);

    if let Some(author) = creator.as_deref().and_then(clean) {
        metadata.add_user(&author);
        metadata.author = Some(author);
    }
    if let Some(initial) = initial_creator.as_deref().and_then(clean) {
        metadata.add_user(&initial);
        metadata.creator = Some(initial);
    }
    if let Some(application) = generator.as_deref().and_then(clean) {
        metadata.add_software(&application);
        metadata.application = Some(application);
    }
    if let Some(template) = &template {
        metadata.add_path_if_separated(template);
        metadata.template = Some(template.clone());
    }
    metadata.created = creation_date.as_deref().and_then(parse_xml_datetime);
    metadata.modified = date.as_deref().and_then(parse_xml_datetime);

    let raw_fields = [
        ("creator", creator),
        ("initial_creator", initial_creator),
        ("generator", generator),
        ("creation_date", creation_date),
        ("date", date),
        ("template", template),
        ("title", xml::find_text(&els, "title")),
        ("subject", xml::find_text(&els, "subject")),
    ];
    for (key, value) in raw_fields {
        if let Some(value) = value {
            metadata.set_raw(key, value);
        }
    }

    Ok(())
}

impl MetadataExtractor for OpenDocumentExtractor {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_metadata(&self) -> Result<DocumentMetadata, ExtractionError> {
        let mut archive = self.open()?;
        let content = read_part(&mut archive, "meta.xml")?.ok_or_else(|| {
            ExtractionError::InvalidContainer("meta.xml not found in document".into())
        })?;

        let mut metadata = DocumentMetadata::for_path(&self.path, self.file_type);
        apply_meta(&mut metadata, &content)?;
        Ok(metadata)
    }

    fn read_text(&self) -> Result<Option<String>, ExtractionError> {
        let mut archive = self.open()?;
        match read_part(&mut archive, "content.xml")? {
            Some(content) => Ok(Some(xml::text_nodes(&content)?.join(" "))),
            None => Ok(None),
        }
    }
}

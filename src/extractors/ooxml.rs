//! Office Open XML extractors (DOCX, XLSX, PPTX).
//!
//! All three share the same package layout: descriptive properties live in
//! `docProps/core.xml` (Dublin Core) and `docProps/app.xml` (extended
//! properties), body content in format-specific parts.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use super::values::{clean, decode_bytes, parse_xml_datetime};
use super::xml;
use super::{ExtractionError, MetadataExtractor};
use crate::models::{DocumentMetadata, FileType};

const CORE_PART: &str = "docProps/core.xml";
const APP_PART: &str = "docProps/app.xml";

/// Per-format differences between the OOXML variants.
struct Flavor {
    label: &'static str,
    file_type: FileType,
    main_part: &'static str,
    /// Raw keys for creator / last editor.
    user_keys: (&'static str, &'static str),
}

const WORD: Flavor = Flavor {
    label: "DOCX",
    file_type: FileType::Docx,
    main_part: "word/document.xml",
    user_keys: ("author", "last_modified_by"),
};

const SHEET: Flavor = Flavor {
    label: "XLSX",
    file_type: FileType::Xlsx,
    main_part: "xl/workbook.xml",
    user_keys: ("creator", "lastModifiedBy"),
};

const SLIDE: Flavor = Flavor {
    label: "PPTX",
    file_type: FileType::Pptx,
    main_part: "ppt/presentation.xml",
    user_keys: ("author", "last_modified_by"),
};

/// An opened OOXML package.
struct Package {
    archive: ZipArchive<File>,
}

impl Package {
    fn open(path: &Path, flavor: &Flavor) -> Result<Self, ExtractionError> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(file).map_err(|e| {
            ExtractionError::InvalidContainer(format!("Invalid {} file: {}", flavor.label, e))
        })?;

        if !archive.file_names().any(|n| n == flavor.main_part) {
            return Err(ExtractionError::InvalidContainer(format!(
                "Invalid {} file: missing {}",
                flavor.label, flavor.main_part
            )));
        }

        Ok(Self { archive })
    }

    /// Read a part as text; `None` when the part is absent.
    fn read(&mut self, name: &str) -> Result<Option<String>, ExtractionError> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        Ok(Some(decode_bytes(&buf)))
    }

    /// Part names under `prefix` ending in `.xml`, ordered by their number
    /// (`slide2.xml` before `slide10.xml`).
    fn numbered_parts(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .archive
            .file_names()
            .filter(|n| n.starts_with(prefix) && n.ends_with(".xml") && !n[prefix.len()..].contains('/'))
            .map(str::to_string)
            .collect();
        names.sort_by_key(|n| (part_number(n), n.clone()));
        names
    }
}

fn part_number(name: &str) -> u32 {
    let stem = name.rsplit('/').next().unwrap_or(name);
    stem.chars()
        .filter(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

#[derive(Debug, Default)]
struct CoreProperties {
    creator: Option<String>,
    last_modified_by: Option<String>,
    created: Option<String>,
    modified: Option<String>,
    title: Option<String>,
    subject: Option<String>,
    category: Option<String>,
    revision: Option<String>,
}

impl CoreProperties {
    fn parse(content: &str) -> Result<Self, ExtractionError> {
        let els = xml::elements(content)?;
        Ok(Self {
            creator: xml::find_text(&els, "creator"),
            last_modified_by: xml::find_text(&els, "lastModifiedBy"),
            created: xml::find_text(&els, "created"),
            modified: xml::find_text(&els, "modified"),
            title: xml::find_text(&els, "title"),
            subject: xml::find_text(&els, "subject"),
            category: xml::find_text(&els, "category"),
            revision: xml::find_text(&els, "revision"),
        })
    }
}

#[derive(Debug, Default)]
struct AppProperties {
    application: Option<String>,
    app_version: Option<String>,
    template: Option<String>,
}

impl AppProperties {
    fn parse(content: &str) -> Result<Self, ExtractionError> {
        let els = xml::elements(content)?;
        Ok(Self {
            application: xml::find_text(&els, "Application"),
            app_version: xml::find_text(&els, "AppVersion"),
            template: xml::find_text(&els, "Template"),
        })
    }
}

fn read_ooxml_metadata(path: &Path, flavor: &Flavor) -> Result<DocumentMetadata, ExtractionError> {
    let mut package = Package::open(path, flavor)?;
    let mut metadata = DocumentMetadata::for_path(path, flavor.file_type);

    let core = match package.read(CORE_PART)? {
        Some(content) => CoreProperties::parse(&content)?,
        None => CoreProperties::default(),
    };

    if let Some(author) = core.creator.as_deref().and_then(clean) {
        metadata.add_user(&author);
        metadata.author = Some(author);
    }
    if let Some(editor) = core.last_modified_by.as_deref().and_then(clean) {
        metadata.add_user(&editor);
        metadata.last_modified_by = Some(editor);
    }
    metadata.created = core.created.as_deref().and_then(parse_xml_datetime);
    metadata.modified = core.modified.as_deref().and_then(parse_xml_datetime);

    let (creator_key, editor_key) = flavor.user_keys;
    let raw_fields = [
        (creator_key, &core.creator),
        (editor_key, &core.last_modified_by),
        ("created", &core.created),
        ("modified", &core.modified),
        ("title", &core.title),
        ("subject", &core.subject),
        ("category", &core.category),
        ("revision", &core.revision),
    ];
    for (key, value) in raw_fields {
        if let Some(value) = value {
            metadata.set_raw(key, value.clone());
        }
    }

    // Extended properties are optional and often hand-edited; a broken
    // app.xml never fails the document.
    match package.read(APP_PART).and_then(|c| c.map(|c| AppProperties::parse(&c)).transpose()) {
        Ok(Some(app)) => apply_app_properties(&mut metadata, app),
        Ok(None) => {}
        Err(e) => debug!("Ignoring unreadable {} in {}: {}", APP_PART, path.display(), e),
    }

    Ok(metadata)
}

fn apply_app_properties(metadata: &mut DocumentMetadata, app: AppProperties) {
    if let Some(application) = app.application.as_deref().and_then(clean) {
        metadata.add_software(&application);
        metadata.set_raw("application", application.clone());
        metadata.application = Some(application);
    }
    if let Some(version) = app.app_version.as_deref().and_then(clean) {
        metadata.set_raw("app_version", version.clone());
        metadata.app_version = Some(version);
    }
    if let Some(template) = app.template.as_deref().and_then(clean) {
        metadata.add_path_if_separated(&template);
        metadata.set_raw("template", template.clone());
        metadata.template = Some(template);
    }
}

/// Word processing documents.
pub struct DocxExtractor {
    path: PathBuf,
}

impl DocxExtractor {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl MetadataExtractor for DocxExtractor {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_metadata(&self) -> Result<DocumentMetadata, ExtractionError> {
        read_ooxml_metadata(&self.path, &WORD)
    }

    fn read_text(&self) -> Result<Option<String>, ExtractionError> {
        let mut package = Package::open(&self.path, &WORD)?;
        let Some(body) = package.read(WORD.main_part)? else {
            return Ok(None);
        };
        Ok(Some(xml::paragraphs(&body, "p", "t")?.join("\n")))
    }
}

/// Spreadsheets.
pub struct XlsxExtractor {
    path: PathBuf,
}

impl XlsxExtractor {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl MetadataExtractor for XlsxExtractor {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_metadata(&self) -> Result<DocumentMetadata, ExtractionError> {
        read_ooxml_metadata(&self.path, &SHEET)
    }

    fn read_text(&self) -> Result<Option<String>, ExtractionError> {
        let mut package = Package::open(&self.path, &SHEET)?;

        let shared_strings = match package.read("xl/sharedStrings.xml")? {
            Some(content) => xml::paragraphs(&content, "si", "t")?,
            None => Vec::new(),
        };

        let mut cells = Vec::new();
        for sheet in package.numbered_parts("xl/worksheets/") {
            let Some(content) = package.read(&sheet)? else {
                continue;
            };
            collect_cell_values(&content, &shared_strings, &mut cells)?;
        }

        Ok(Some(cells.join(" ")))
    }
}

/// Append every non-empty cell value in a worksheet, resolving shared strings.
fn collect_cell_values(
    sheet: &str,
    shared_strings: &[String],
    out: &mut Vec<String>,
) -> Result<(), ExtractionError> {
    let mut cell_type: Option<String> = None;

    for el in xml::elements(sheet)? {
        match el.name.as_str() {
            "c" => cell_type = el.attribute("t").map(str::to_string),
            "v" => {
                let value = el.text.trim();
                if value.is_empty() {
                    continue;
                }
                let resolved = if cell_type.as_deref() == Some("s") {
                    value
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| shared_strings.get(i))
                        .cloned()
                        .unwrap_or_default()
                } else {
                    value.to_string()
                };
                if !resolved.is_empty() {
                    out.push(resolved);
                }
            }
            // Inline strings
            "t" if cell_type.as_deref() == Some("inlineStr") => {
                if !el.text.is_empty() {
                    out.push(el.text);
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// Presentations.
pub struct PptxExtractor {
    path: PathBuf,
}

impl PptxExtractor {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl MetadataExtractor for PptxExtractor {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_metadata(&self) -> Result<DocumentMetadata, ExtractionError> {
        read_ooxml_metadata(&self.path, &SLIDE)
    }

    fn read_text(&self) -> Result<Option<String>, ExtractionError> {
        let mut package = Package::open(&self.path, &SLIDE)?;

        let mut texts = Vec::new();
        for slide in package.numbered_parts("ppt/slides/") {
            if let Some(content) = package.read(&slide)? {
                texts.extend(xml::paragraphs(&content, "p", "t")?);
            }
        }

        Ok(Some(texts.join("\n")))
    }
}

//! Legacy compound-binary Office files (DOC, XLS, PPT).
//!
//! Descriptive properties live in the OLE property-set streams
//! `\x05SummaryInformation` and `\x05DocumentSummaryInformation`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use cfb::CompoundFile;
use tracing::debug;

use super::values::{clean, decode_bytes, decode_utf16le, filetime_to_datetime};
use super::{ExtractionError, MetadataExtractor};
use crate::models::{DocumentMetadata, FileType};

const SUMMARY_STREAM: &str = "\u{5}SummaryInformation";
const DOC_SUMMARY_STREAM: &str = "\u{5}DocumentSummaryInformation";

const BYTE_ORDER_MARK: u16 = 0xFFFE;
const PID_CODEPAGE: u32 = 1;

const VT_I2: u32 = 2;
const VT_I4: u32 = 3;
const VT_LPSTR: u32 = 30;
const VT_LPWSTR: u32 = 31;
const VT_FILETIME: u32 = 64;

const CODEPAGE_UTF16: u16 = 1200;
const CODEPAGE_UTF8: u16 = 65001;

/// Property ids of the SummaryInformation set and the raw keys they are stored under.
const SUMMARY_FIELDS: &[(u32, &str)] = &[
    (2, "title"),
    (3, "subject"),
    (4, "author"),
    (5, "keywords"),
    (6, "comments"),
    (7, "template"),
    (8, "last_saved_by"),
    (9, "revision_number"),
    (10, "total_edit_time"),
    (12, "create_time"),
    (13, "last_saved_time"),
    (14, "num_pages"),
    (15, "num_words"),
    (16, "num_chars"),
    (18, "creating_application"),
];

const DOC_SUMMARY_FIELDS: &[(u32, &str)] = &[(14, "manager"), (15, "company")];

/// Sanity cap on the number of properties in one section.
const MAX_PROPERTIES: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
enum PropertyValue {
    Int(i64),
    Text(String),
    /// FILETIME ticks; a timestamp or, for edit time, a duration.
    Time(u64),
}

/// Bounds-checked little-endian reads over a property-set stream.
struct StreamView<'a> {
    data: &'a [u8],
}

impl<'a> StreamView<'a> {
    fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], ExtractionError> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| {
                ExtractionError::PropertySet(format!("read of {} bytes at {} out of bounds", len, offset))
            })
    }

    fn u16_at(&self, offset: usize) -> Result<u16, ExtractionError> {
        let b = self.bytes(offset, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32_at(&self, offset: usize) -> Result<u32, ExtractionError> {
        let b = self.bytes(offset, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64_at(&self, offset: usize) -> Result<u64, ExtractionError> {
        let low = self.u32_at(offset)? as u64;
        let high = self.u32_at(offset + 4)? as u64;
        Ok((high << 32) | low)
    }
}

/// Parse the first section of a property-set stream into id -> value.
///
/// Property types other than integers, strings and FILETIMEs are skipped.
fn parse_property_set(data: &[u8]) -> Result<BTreeMap<u32, PropertyValue>, ExtractionError> {
    let view = StreamView { data };
    let mut values = BTreeMap::new();

    if view.u16_at(0)? != BYTE_ORDER_MARK {
        return Err(ExtractionError::PropertySet("bad byte order mark".into()));
    }
    if view.u32_at(24)? == 0 {
        return Ok(values);
    }

    let section = view.u32_at(44)? as usize;
    let count = view.u32_at(section + 4)? as usize;
    if count > MAX_PROPERTIES {
        return Err(ExtractionError::PropertySet(format!("{} properties in section", count)));
    }

    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let entry = section + 8 + i * 8;
        entries.push((view.u32_at(entry)?, view.u32_at(entry + 4)? as usize));
    }

    let codepage = entries
        .iter()
        .find(|(id, _)| *id == PID_CODEPAGE)
        .map(|(_, offset)| view.u16_at(section + offset + 4))
        .transpose()?;

    for (id, offset) in entries {
        if id <= PID_CODEPAGE {
            continue;
        }
        let pos = section + offset;
        let value_type = view.u32_at(pos)? & 0xFFFF;

        let value = match value_type {
            VT_I2 => PropertyValue::Int(view.u16_at(pos + 4)? as i16 as i64),
            VT_I4 => PropertyValue::Int(view.u32_at(pos + 4)? as i32 as i64),
            VT_LPSTR => {
                let len = view.u32_at(pos + 4)? as usize;
                let raw = view.bytes(pos + 8, len)?;
                let text = match codepage {
                    Some(CODEPAGE_UTF16) => decode_utf16le(raw),
                    Some(CODEPAGE_UTF8) => String::from_utf8_lossy(raw).into_owned(),
                    _ => decode_bytes(raw),
                };
                PropertyValue::Text(text.trim_end_matches('\0').to_string())
            }
            VT_LPWSTR => {
                let chars = view.u32_at(pos + 4)? as usize;
                let raw = view.bytes(pos + 8, chars.saturating_mul(2))?;
                PropertyValue::Text(decode_utf16le(raw))
            }
            VT_FILETIME => PropertyValue::Time(view.u64_at(pos + 4)?),
            other => {
                debug!("Skipping property {} of type {}", id, other);
                continue;
            }
        };
        values.insert(id, value);
    }

    Ok(values)
}

/// String-coerce a property for the raw bag.
fn raw_value(key: &str, value: &PropertyValue) -> Option<String> {
    match value {
        PropertyValue::Text(text) => clean(text),
        PropertyValue::Int(n) => Some(n.to_string()),
        PropertyValue::Time(ticks) if key == "total_edit_time" => Some((ticks / 10_000_000).to_string()),
        PropertyValue::Time(ticks) => filetime_to_datetime(*ticks).map(|dt| dt.to_rfc3339()),
    }
}

fn read_stream(
    compound: &mut CompoundFile<File>,
    name: &str,
) -> Result<Option<Vec<u8>>, ExtractionError> {
    if !compound.is_stream(name) {
        return Ok(None);
    }
    let mut stream = compound.open_stream(name)?;
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    Ok(Some(buf))
}

/// Doc, Xls and Ppt files.
pub struct LegacyOfficeExtractor {
    path: PathBuf,
    file_type: FileType,
}

impl LegacyOfficeExtractor {
    pub fn new(path: PathBuf, file_type: FileType) -> Self {
        Self { path, file_type }
    }

    fn apply_section(
        metadata: &mut DocumentMetadata,
        values: &BTreeMap<u32, PropertyValue>,
        fields: &[(u32, &str)],
    ) {
        for (id, key) in fields {
            let Some(value) = values.get(id) else {
                continue;
            };

            if let PropertyValue::Time(ticks) = value {
                match *key {
                    "create_time" => metadata.created = filetime_to_datetime(*ticks),
                    "last_saved_time" => metadata.modified = filetime_to_datetime(*ticks),
                    _ => {}
                }
            }

            let Some(text) = raw_value(key, value) else {
                continue;
            };
            match *key {
                "author" => {
                    metadata.add_user(&text);
                    metadata.author = Some(text.clone());
                }
                "last_saved_by" => {
                    metadata.add_user(&text);
                    metadata.last_modified_by = Some(text.clone());
                }
                "manager" => {
                    metadata.add_user(&text);
                }
                "creating_application" => {
                    metadata.add_software(&text);
                    metadata.application = Some(text.clone());
                }
                "template" => {
                    metadata.add_path_if_separated(&text);
                    metadata.template = Some(text.clone());
                }
                _ => {}
            }
            metadata.set_raw(key, text);
        }
    }
}

impl MetadataExtractor for LegacyOfficeExtractor {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_metadata(&self) -> Result<DocumentMetadata, ExtractionError> {
        let file = File::open(&self.path)?;
        let mut compound = CompoundFile::open(file)
            .map_err(|_| ExtractionError::InvalidContainer("Not a valid OLE file".into()))?;

        let mut metadata = DocumentMetadata::for_path(&self.path, self.file_type);

        if let Some(data) = read_stream(&mut compound, SUMMARY_STREAM)? {
            let values = parse_property_set(&data)?;
            Self::apply_section(&mut metadata, &values, SUMMARY_FIELDS);
        }
        if let Some(data) = read_stream(&mut compound, DOC_SUMMARY_STREAM)? {
            let values = parse_property_set(&data)?;
            Self::apply_section(&mut metadata, &values, DOC_SUMMARY_FIELDS);
        }

        Ok(metadata)
    }

    /// Body text of the binary formats is not parsed.
    fn read_text(&self) -> Result<Option<String>, ExtractionError> {
        Ok(None)
    }
}

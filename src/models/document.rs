//! Per-document metadata models.
//!
//! A `DocumentMetadata` is produced for every file that a metadata extractor
//! opened successfully. The indicator lists (`users`, `software`, `paths`,
//! `emails`) are kept duplicate-free at insertion time and preserve the order
//! in which values were first seen inside the document.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Document formats recognised by the extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Doc,
    Docx,
    Xls,
    Xlsx,
    Ppt,
    Pptx,
    Odt,
    Ods,
    Odp,
}

impl FileType {
    /// Every recognised file type, in declaration order.
    pub const ALL: [FileType; 10] = [
        Self::Pdf,
        Self::Doc,
        Self::Docx,
        Self::Xls,
        Self::Xlsx,
        Self::Ppt,
        Self::Pptx,
        Self::Odt,
        Self::Ods,
        Self::Odp,
    ];

    /// File types searched for when none are given on the command line.
    pub const DEFAULT_SEARCH: [FileType; 7] = [
        Self::Pdf,
        Self::Doc,
        Self::Docx,
        Self::Xls,
        Self::Xlsx,
        Self::Ppt,
        Self::Pptx,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Docx => "docx",
            Self::Xls => "xls",
            Self::Xlsx => "xlsx",
            Self::Ppt => "ppt",
            Self::Pptx => "pptx",
            Self::Odt => "odt",
            Self::Ods => "ods",
            Self::Odp => "odp",
        }
    }

    /// Parse a file extension (without the dot), ignoring case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        Self::ALL.into_iter().find(|ft| ft.as_str() == ext)
    }

    /// Determine the file type of a path from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata extracted from a single document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: String,
    pub file_type: FileType,
    pub source_url: Option<String>,

    pub author: Option<String>,
    pub creator: Option<String>,
    pub last_modified_by: Option<String>,
    pub users: Vec<String>,

    pub producer: Option<String>,
    pub application: Option<String>,
    pub app_version: Option<String>,
    pub software: Vec<String>,

    pub template: Option<String>,
    /// Filesystem paths and server names.
    pub paths: Vec<String>,
    pub emails: Vec<String>,

    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,

    /// Every property read from the container, string-coerced, for audit.
    pub raw: BTreeMap<String, String>,
}

impl DocumentMetadata {
    /// Create empty metadata for a file.
    pub fn new(filename: impl Into<String>, file_type: FileType) -> Self {
        Self {
            filename: filename.into(),
            file_type,
            source_url: None,
            author: None,
            creator: None,
            last_modified_by: None,
            users: Vec::new(),
            producer: None,
            application: None,
            app_version: None,
            software: Vec::new(),
            template: None,
            paths: Vec::new(),
            emails: Vec::new(),
            created: None,
            modified: None,
            raw: BTreeMap::new(),
        }
    }

    /// Create empty metadata named after the path's file name.
    pub fn for_path(path: &Path, file_type: FileType) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(filename, file_type)
    }

    /// Record a user name. Returns false if it was empty or already present.
    pub fn add_user(&mut self, user: &str) -> bool {
        push_unique(&mut self.users, user)
    }

    /// Record a software name. Returns false if it was empty or already present.
    pub fn add_software(&mut self, software: &str) -> bool {
        push_unique(&mut self.software, software)
    }

    /// Record a path or server name. Returns false if it was empty or already present.
    pub fn add_path(&mut self, path: &str) -> bool {
        push_unique(&mut self.paths, path)
    }

    /// Record an email address. Returns false if it was empty or already present.
    pub fn add_email(&mut self, email: &str) -> bool {
        push_unique(&mut self.emails, email)
    }

    /// Record a path only when the value looks like one (contains `/` or `\`).
    pub fn add_path_if_separated(&mut self, value: &str) -> bool {
        if value.contains('/') || value.contains('\\') {
            self.add_path(value)
        } else {
            false
        }
    }

    /// Store a raw property value for audit.
    pub fn set_raw(&mut self, key: &str, value: impl Into<String>) {
        self.raw.insert(key.to_string(), value.into());
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) -> bool {
    if value.is_empty() || list.iter().any(|v| v == value) {
        return false;
    }
    list.push(value.to_string());
    true
}

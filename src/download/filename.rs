//! Local file naming for downloaded documents.

use std::path::Path;

/// Used when a URL path has no final segment.
pub const PLACEHOLDER_NAME: &str = "downloaded_file";

const MAX_NAME_CHARS: usize = 200;
const MAX_STEM_CHARS: usize = 190;

/// Last path segment of `url`, percent-decoded, without any query string.
pub fn filename_from_url(url: &str) -> String {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let decoded = urlencoding::decode(&path)
        .map(|s| s.into_owned())
        .unwrap_or(path);

    let segment = decoded.rsplit('/').next().unwrap_or_default();
    let segment = segment.split('?').next().unwrap_or_default();

    if segment.is_empty() {
        PLACEHOLDER_NAME.to_string()
    } else {
        segment.to_string()
    }
}

/// Replace characters unsafe on common filesystems and cap the length,
/// keeping the extension when the stem is shortened.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect();

    if sanitized.chars().count() <= MAX_NAME_CHARS {
        return sanitized;
    }

    match sanitized.rsplit_once('.') {
        Some((stem, ext)) => {
            let stem: String = stem.chars().take(MAX_STEM_CHARS).collect();
            if ext.is_empty() {
                stem
            } else {
                format!("{}.{}", stem, ext)
            }
        }
        None => sanitized.chars().take(MAX_STEM_CHARS).collect(),
    }
}

/// `report.pdf` -> `report_2.pdf`.
pub fn numbered_filename(name: &str, n: usize) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{}_{}", stem, n),
    }
}

//! Indicator mining over extracted document text.
//!
//! Pure functions that recover email addresses, URLs, hostnames and
//! filesystem paths from arbitrary text. Every function returns a sorted,
//! duplicate-free list.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)https?://[^\s<>"')\]}>]+"#).unwrap());

static HOSTNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}\b").unwrap()
});

static WINDOWS_PATH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[A-Za-z]:\\[^\s<>"']+"#).unwrap());

static UNIX_PATH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"/(?:[^\s<>"'/]+/)+[^\s<>"']+"#).unwrap());

static UNC_PATH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\\\\[^\s<>"']+"#).unwrap());

/// Placeholder domains that show up in templates and boilerplate.
const EMAIL_BLACKLIST: &[&str] = &[
    "example.com",
    "example.org",
    "test.com",
    "localhost",
    "domain.com",
];

/// File extensions that regex-match as a top-level domain.
const FALSE_TLDS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".zip", ".rar", ".exe", ".dll",
    ".jpg", ".jpeg", ".png", ".gif",
];

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', '>', ']', '}'];

/// Extract email addresses, lower-cased, without placeholder domains or
/// document-name lookalikes such as `report@2023.pdf`.
pub fn extract_emails(text: &str) -> Vec<String> {
    let mut emails = BTreeSet::new();

    for m in EMAIL_PATTERN.find_iter(text) {
        let email = m.as_str().to_lowercase();

        let domain = email.split_once('@').map(|(_, d)| d).unwrap_or("");
        if EMAIL_BLACKLIST.contains(&domain) {
            continue;
        }
        if has_false_tld(&email) {
            continue;
        }

        emails.insert(email);
    }

    emails.into_iter().collect()
}

/// Extract `http(s)://` URLs with trailing sentence punctuation removed.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| trim_trailing_punctuation(m.as_str()))
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Extract hostnames, lower-cased. When `domain` is given only hostnames
/// ending with it (case-insensitive) are kept.
pub fn extract_hostnames(text: &str, domain: Option<&str>) -> Vec<String> {
    let domain = domain.map(str::to_lowercase);
    let mut hostnames = BTreeSet::new();

    for m in HOSTNAME_PATTERN.find_iter(text) {
        let hostname = m.as_str().to_lowercase();

        if has_false_tld(&hostname) {
            continue;
        }
        if let Some(ref domain) = domain {
            if !hostname.ends_with(domain.as_str()) {
                continue;
            }
        }

        hostnames.insert(hostname);
    }

    hostnames.into_iter().collect()
}

/// Extract Windows drive paths, POSIX absolute paths and UNC shares.
pub fn extract_paths(text: &str) -> Vec<String> {
    let mut paths = BTreeSet::new();

    for m in WINDOWS_PATH_PATTERN.find_iter(text) {
        let path = trim_trailing_punctuation(m.as_str());
        if !path.is_empty() {
            paths.insert(path.to_string());
        }
    }

    for m in UNIX_PATH_PATTERN.find_iter(text) {
        let path = trim_trailing_punctuation(m.as_str());
        // Short matches are mostly fractions and dates
        if path.len() > 3 {
            paths.insert(path.to_string());
        }
    }

    for m in UNC_PATH_PATTERN.find_iter(text) {
        let path = trim_trailing_punctuation(m.as_str());
        if !path.is_empty() {
            paths.insert(path.to_string());
        }
    }

    paths.into_iter().collect()
}

fn has_false_tld(value: &str) -> bool {
    FALSE_TLDS.iter().any(|ext| value.ends_with(ext))
}

fn trim_trailing_punctuation(value: &str) -> &str {
    value.trim_end_matches(TRAILING_PUNCTUATION)
}

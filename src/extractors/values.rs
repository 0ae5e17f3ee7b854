//! Helpers for turning raw container property values into strings and dates.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Decode bytes of unknown encoding.
///
/// Tries UTF-8, then ISO-8859-1, then Windows-1252, and finally lossy UTF-8.
/// The ISO-8859-1 step only accepts text without C1 control bytes
/// (0x80-0x9F): in office metadata those bytes are Windows-1252 punctuation
/// (curly quotes, dashes, the euro sign), and decoding them as Latin-1 would
/// yield invisible control characters instead.
pub fn decode_bytes(bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    if let Some(s) = decode_latin1(bytes) {
        return s;
    }
    if let Some(s) = encoding_rs::WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes) {
        return s.into_owned();
    }
    String::from_utf8_lossy(bytes).into_owned()
}

/// ISO-8859-1, refusing C1 control bytes.
fn decode_latin1(bytes: &[u8]) -> Option<String> {
    if bytes.iter().any(|b| (0x80..0xA0).contains(b)) {
        return None;
    }
    Some(bytes.iter().map(|&b| b as char).collect())
}

/// Decode UTF-16 little-endian code units, dropping trailing NULs.
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
        .trim_end_matches('\0')
        .to_string()
}

/// Decode UTF-16 big-endian code units.
pub fn decode_utf16be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
        .trim_end_matches('\0')
        .to_string()
}

/// Trim whitespace and NULs; `None` when nothing is left.
pub fn clean(value: &str) -> Option<String> {
    let trimmed = value.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse the timestamp formats found in OOXML and OpenDocument properties.
///
/// Values without an offset are taken as UTC.
pub fn parse_xml_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse a PDF date string such as `D:20230114093000+01'00'`.
pub fn parse_pdf_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let value = value.strip_prefix("D:").unwrap_or(value);

    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return None;
    }
    let field = |start: usize, len: usize, default: u32| -> u32 {
        digits
            .get(start..start + len)
            .and_then(|s| s.parse().ok())
            .unwrap_or(default)
    };

    let year: i32 = digits[..4].parse().ok()?;
    let naive = NaiveDate::from_ymd_opt(year, field(4, 2, 1), field(6, 2, 1))?.and_hms_opt(
        field(8, 2, 0),
        field(10, 2, 0),
        field(12, 2, 0),
    )?;

    let rest = &value[digits.len()..];
    let offset_secs = match rest.chars().next() {
        Some(sign @ ('+' | '-')) => {
            let tz: String = rest[1..].chars().filter(|c| c.is_ascii_digit()).collect();
            let hours: i32 = tz.get(0..2).and_then(|s| s.parse().ok()).unwrap_or(0);
            let minutes: i32 = tz.get(2..4).and_then(|s| s.parse().ok()).unwrap_or(0);
            let secs = hours * 3600 + minutes * 60;
            if sign == '-' {
                -secs
            } else {
                secs
            }
        }
        _ => 0,
    };

    chrono::FixedOffset::east_opt(offset_secs)?
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Convert a Windows FILETIME (100ns ticks since 1601-01-01) to UTC.
pub fn filetime_to_datetime(ticks: u64) -> Option<DateTime<Utc>> {
    const EPOCH_DIFFERENCE_SECS: i64 = 11_644_473_600;
    if ticks == 0 {
        return None;
    }
    let secs = (ticks / 10_000_000) as i64 - EPOCH_DIFFERENCE_SECS;
    let nanos = ((ticks % 10_000_000) * 100) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_decode_prefers_utf8() {
        assert_eq!(decode_bytes("José".as_bytes()), "José");
    }

    #[test]
    fn test_decode_falls_back_to_latin1() {
        assert_eq!(decode_bytes(&[0x4a, 0x6f, 0x73, 0xe9]), "José");
    }

    #[test]
    fn test_latin1_step_refuses_control_bytes() {
        assert_eq!(decode_latin1(&[0x43, 0x61, 0x66, 0xe9]).as_deref(), Some("Caf\u{e9}"));
        assert_eq!(decode_latin1(&[0x80, 0x35]), None);
        assert_eq!(decode_bytes(&[0x80, 0x35]), "\u{20ac}5");
    }

    #[test]
    fn test_decode_uses_windows_1252_for_c1_bytes() {
        // 0x93 / 0x94 are curly quotes in Windows-1252
        assert_eq!(decode_bytes(&[0x93, 0x68, 0x69, 0x94]), "\u{201c}hi\u{201d}");
    }

    #[test]
    fn test_decode_never_fails() {
        // 0x81 is unmapped in Windows-1252
        let decoded = decode_bytes(&[0x81, 0x41]);
        assert!(decoded.ends_with('A'));
    }

    #[test]
    fn test_clean_trims_and_drops_empty() {
        assert_eq!(clean("  jdoe \0"), Some("jdoe".to_string()));
        assert_eq!(clean("   "), None);
    }

    #[test]
    fn test_xml_datetime_variants() {
        let utc = parse_xml_datetime("2023-03-01T10:15:00Z").unwrap();
        assert_eq!(utc.hour(), 10);

        let naive = parse_xml_datetime("2023-03-01T10:15:00.123456789").unwrap();
        assert_eq!(naive.day(), 1);

        assert!(parse_xml_datetime("yesterday").is_none());
    }

    #[test]
    fn test_pdf_date_with_offset() {
        let dt = parse_pdf_date("D:20230114093000+01'00'").unwrap();
        assert_eq!(dt.year(), 2023);
        assert_eq!(dt.hour(), 8);
    }

    #[test]
    fn test_pdf_date_partial() {
        let dt = parse_pdf_date("D:2021").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2021, 1, 1));
        assert!(parse_pdf_date("garbage").is_none());
    }

    #[test]
    fn test_filetime_conversion() {
        // 2000-01-01T00:00:00Z
        let dt = filetime_to_datetime(125_911_584_000_000_000).unwrap();
        assert_eq!(dt.year(), 2000);
        assert!(filetime_to_datetime(0).is_none());
    }
}

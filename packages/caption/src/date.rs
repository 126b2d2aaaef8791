//! Lenient date parsing for caption text.
//!
//! Spreadsheet date columns arrive in whatever shape the author typed or
//! the reader rendered them in. Captions are always written as
//! `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Format written onto images.
pub const CAPTION_DATE_FORMAT: &str = "%Y-%m-%d";

/// Date-only layouts, tried in order. Slash dates are month-first.
/// `%Y%m%d` covers numeric workbook cells such as `20240102`.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y%m%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Date-time layouts, tried in order after [`DATE_FORMATS`].
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parses a raw caption date. Returns `None` for empty or unrecognised
/// input.
#[must_use]
pub fn parse_caption_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
    {
        return Some(date);
    }

    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(dt.date());
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Parses a raw caption date and renders it as `YYYY-MM-DD`.
#[must_use]
pub fn format_caption_date(raw: &str) -> Option<String> {
    parse_caption_date(raw).map(|date| date.format(CAPTION_DATE_FORMAT).to_string())
}

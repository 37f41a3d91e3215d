//! Date parsing for user input and for cells read back from the sheet.
//!
//! Everything is normalized to ISO `YYYY-MM-DD` strings. Sheets returns dates as serial numbers
//! when read with `UNFORMATTED_VALUE`, where day zero is 1899-12-30.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

const MS_PER_DAY: f64 = 86_400_000.0;

static ISO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid ISO regex"));

static DMY_INPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})/(\d{2})/(\d{4})$").expect("valid DMY regex"));

static DMY_SHEET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[/\-](\d{1,2})[/\-](\d{2,4})$").expect("valid sheet DMY regex")
});

/// Formats tried, in order, when a sheet cell matches neither ISO nor day-first dates.
const FALLBACK_FORMATS: &[&str] = &["%Y/%m/%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y"];
const FALLBACK_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

fn serial_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .unwrap_or_default()
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
}

/// Normalizes a date typed by a user. `YYYY-MM-DD` passes through, `DD/MM/YYYY` is reordered and
/// anything else is returned trimmed but otherwise unchanged, so callers must still validate it.
pub fn normalize_date(input: &str) -> String {
    let s = input.trim();
    if ISO.is_match(s) {
        return s.to_string();
    }
    if let Some(c) = DMY_INPUT.captures(s) {
        return format!("{}-{}-{}", &c[3], &c[2], &c[1]);
    }
    s.to_string()
}

/// Converts a Sheets date serial to ISO. Fractions of a day are dropped. Non-finite input gives
/// the empty string.
pub fn sheet_serial_to_iso(serial: f64) -> String {
    if !serial.is_finite() {
        return String::new();
    }
    let ms = (serial * MS_PER_DAY).trunc() as i64;
    match serial_epoch().checked_add_signed(Duration::milliseconds(ms)) {
        Some(dt) => dt.date().format("%Y-%m-%d").to_string(),
        None => String::new(),
    }
}

/// The inverse of `sheet_serial_to_iso` for whole days.
pub fn iso_to_serial(iso: &str) -> Option<i64> {
    let date = parse_iso(iso)?;
    Some((date - serial_epoch().date()).num_days())
}

/// Parses a strict `YYYY-MM-DD` string into a real calendar date.
pub fn parse_iso(iso: &str) -> Option<NaiveDate> {
    if !ISO.is_match(iso) {
        return None;
    }
    NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok()
}

/// Normalizes a column A cell read from the sheet. Numbers are date serials; strings may be ISO,
/// day-first with `/` or `-` (two digit years are 20YY), or one of a few long forms. Returns the
/// empty string when nothing matches.
pub fn normalize_sheet_date(cell: Option<&Value>) -> String {
    match cell {
        Some(Value::Number(n)) => n.as_f64().map(sheet_serial_to_iso).unwrap_or_default(),
        Some(Value::String(s)) => normalize_sheet_text(s.trim()),
        _ => String::new(),
    }
}

fn normalize_sheet_text(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    if ISO.is_match(s) {
        return s.to_string();
    }
    if let Some(c) = DMY_SHEET.captures(s) {
        let year = if c[3].len() == 2 {
            format!("20{}", &c[3])
        } else {
            c[3].to_string()
        };
        return format!("{year}-{:0>2}-{:0>2}", &c[2], &c[1]);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.date_naive().format("%Y-%m-%d").to_string();
    }
    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return dt.date().format("%Y-%m-%d").to_string();
        }
    }
    for fmt in FALLBACK_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.format("%Y-%m-%d").to_string();
        }
    }
    String::new()
}

/// The `YYYY-MM` prefix of an ISO date, if it has one.
pub fn month_key(iso: &str) -> Option<&str> {
    if iso.len() < 7 {
        return None;
    }
    iso.get(..7)
}

pub fn month_key_of(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// True for `YYYY-MM` with a month between 01 and 12.
pub fn is_month_key(key: &str) -> bool {
    parse_iso(&format!("{key}-01")).is_some()
}

//! The month-name table used both to write and to recognize month block labels.
//!
//! Labels look like `Total Pengeluaran Bulan Oktober 2025`. Generation and matching must use the
//! same table: a block labelled in another language is not recognized and a duplicate block gets
//! created instead. Keep a single `Locale` per ledger and pass it wherever labels are handled.

use chrono::{Datelike, NaiveDate};
use regex::Regex;

const INDONESIAN_MONTHS: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

const TOTAL_LABEL_PREFIX: &str = "Total Pengeluaran Bulan";

/// A target month as derived from an ISO date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthYear {
    pub year: i32,
    /// Zero-based.
    pub month_idx: usize,
    pub month_name: String,
}

/// Month name and year as written in a total row label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMonth {
    pub month_name: String,
    pub year: i32,
}

#[derive(Debug, Clone)]
pub struct Locale {
    months: [&'static str; 12],
    total_prefix: &'static str,
    /// `<prefix> <Month> <Year>`, built from `total_prefix`.
    label: Regex,
}

impl Default for Locale {
    fn default() -> Self {
        Self::indonesian()
    }
}

impl Locale {
    pub fn indonesian() -> Self {
        Self::new(INDONESIAN_MONTHS, TOTAL_LABEL_PREFIX)
    }

    /// The words of `total_prefix` may be separated by any whitespace in a label.
    pub fn new(months: [&'static str; 12], total_prefix: &'static str) -> Self {
        let words: Vec<String> = total_prefix
            .split_whitespace()
            .map(regex::escape)
            .collect();
        let pattern = format!(r"(?i){}\s+(\p{{L}}+)\s+(\d{{4}})", words.join(r"\s+"));
        let label = match Regex::new(&pattern) {
            Ok(label) => label,
            // Escaped words joined by \s+ always form a valid pattern.
            Err(e) => unreachable!("label pattern {pattern}: {e}"),
        };
        Self {
            months,
            total_prefix,
            label,
        }
    }

    /// Zero-based month index to name.
    pub fn month_name(&self, month_idx: usize) -> Option<&'static str> {
        self.months.get(month_idx).copied()
    }

    /// Splits a `YYYY-MM-DD` date into year and named month. `None` if it is not a real date.
    pub fn month_year(&self, iso: &str) -> Option<MonthYear> {
        let date = NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok()?;
        let month_idx = date.month0() as usize;
        Some(MonthYear {
            year: date.year(),
            month_idx,
            month_name: self.month_name(month_idx)?.to_string(),
        })
    }

    /// The label written into column A of a total row.
    pub fn total_label(&self, target: &MonthYear) -> String {
        format!("{} {} {}", self.total_prefix, target.month_name, target.year)
    }

    /// True for column A text that marks a total row, labelled or not.
    pub fn is_total_marker(&self, text: &str) -> bool {
        text.to_lowercase()
            .contains(&self.total_prefix.to_lowercase())
    }

    /// Reads month name and year out of a label. `None` means the block is a placeholder.
    pub fn parse_label(&self, label: &str) -> Option<LabelMonth> {
        let c = self.label.captures(label)?;
        Some(LabelMonth {
            month_name: c[1].to_string(),
            year: c[2].parse().ok()?,
        })
    }

    /// True when `label` names the same month and year as `target`, ignoring case.
    pub fn label_matches(&self, label: &str, target: &MonthYear) -> bool {
        match self.parse_label(label) {
            Some(parsed) => {
                parsed.year == target.year
                    && parsed.month_name.to_lowercase() == target.month_name.to_lowercase()
            }
            None => false,
        }
    }
}

//! A1 notation helpers.

use anyhow::{bail, Context};
use std::fmt;
use std::str::FromStr;

/// Quotes a tab name for use in an A1 range: `Proyek A` -> `'Proyek A'`, `Bu'di` -> `'Bu''di'`.
pub fn quote_tab(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Builds `'<tab>'!<cells>`.
pub fn range(tab: &str, cells: impl fmt::Display) -> String {
    format!("{}!{cells}", quote_tab(tab))
}

/// Zero-based column index to letters: 0 -> `A`, 11 -> `L`, 26 -> `AA`.
pub fn column_letter(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (idx % 26) as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Letters to a zero-based column index, ignoring case.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut idx = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        idx = idx * 26 + (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
    }
    Some(idx - 1)
}

/// A parsed A1 range such as `'Proyek A'!A5:K34`, `_PROJECTS!A2:E` or `'Proyek A'!A:A`.
/// Rows are one-based; a missing row means "unbounded" on that side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub tab: String,
    pub start_col: usize,
    pub start_row: Option<usize>,
    pub end_col: usize,
    pub end_row: Option<usize>,
}

impl A1Range {
    /// Zero-based index of the first row covered.
    pub fn first_row_index(&self) -> usize {
        self.start_row.unwrap_or(1).saturating_sub(1)
    }
}

fn parse_cell(cell: &str) -> anyhow::Result<(usize, Option<usize>)> {
    let split = cell
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(split);
    let col = column_index(letters).with_context(|| format!("Bad column in '{cell}'"))?;
    let row = if digits.is_empty() {
        None
    } else {
        let row: usize = digits
            .parse()
            .with_context(|| format!("Bad row in '{cell}'"))?;
        if row == 0 {
            bail!("Rows start at 1 in '{cell}'");
        }
        Some(row)
    };
    Ok((col, row))
}

impl FromStr for A1Range {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tab, cells) = match s.rfind('!') {
            Some(ix) => (&s[..ix], &s[ix + 1..]),
            None => (s, ""),
        };
        let tab = match tab.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
            Some(inner) => inner.replace("''", "'"),
            None => tab.to_string(),
        };
        if tab.is_empty() {
            bail!("A1 range '{s}' has no tab name");
        }
        if cells.is_empty() {
            return Ok(Self {
                tab,
                start_col: 0,
                start_row: None,
                end_col: usize::MAX,
                end_row: None,
            });
        }
        let mut parts = cells.splitn(2, ':');
        let (start_col, start_row) = parse_cell(parts.next().unwrap_or_default())?;
        let (end_col, end_row) = match parts.next() {
            Some(end) => parse_cell(end)?,
            None => (start_col, start_row),
        };
        Ok(Self {
            tab,
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_tab() {
        assert_eq!(quote_tab("Proyek A"), "'Proyek A'");
        assert_eq!(quote_tab("Bu'di"), "'Bu''di'");
        assert_eq!(range("Proyek A", "A5:K34"), "'Proyek A'!A5:K34");
    }

    #[test]
    fn test_columns() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(11), "L");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_index("k"), Some(10));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn test_parse_ranges() {
        let r: A1Range = "'Bu''di'!A5:K34".parse().unwrap();
        assert_eq!(r.tab, "Bu'di");
        assert_eq!((r.start_col, r.start_row), (0, Some(5)));
        assert_eq!((r.end_col, r.end_row), (10, Some(34)));

        let r: A1Range = "_PROJECTS!A2:E".parse().unwrap();
        assert_eq!(r.tab, "_PROJECTS");
        assert_eq!((r.start_row, r.end_col, r.end_row), (Some(2), 4, None));

        let r: A1Range = "'X'!L10".parse().unwrap();
        assert_eq!((r.start_col, r.start_row, r.end_col, r.end_row), (11, Some(10), 11, Some(10)));

        let r: A1Range = "'X'!A:A".parse().unwrap();
        assert_eq!((r.start_row, r.end_row, r.end_col), (None, None, 0));
        assert_eq!(r.first_row_index(), 0);
    }

    #[test]
    fn test_parse_bad_ranges() {
        assert!("'X'!1:2".parse::<A1Range>().is_err());
        assert!("'X'!A0".parse::<A1Range>().is_err());
        assert!("!A1".parse::<A1Range>().is_err());
    }
}

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static K_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)K(\d+)\s*:\s*K(\d+)").expect("valid K range regex"));

static K_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)K(\d+)").expect("valid K cell regex"));

/// A month block: the fillable rows `start_row..=end_row` and the total row that closes them.
/// All rows are one-based sheet rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthBlock {
    pub total_row: usize,
    /// Column A of the total row.
    pub label: String,
    /// Column L of the total row, as a formula string.
    pub formula: String,
    pub start_row: usize,
    pub end_row: usize,
}

impl MonthBlock {
    /// Number of entry rows.
    pub fn capacity(&self) -> usize {
        (self.end_row + 1).saturating_sub(self.start_row)
    }
}

/// Recovers a block's row range from its total formula. `=SUM(K5:K34)` gives `(5, 34)` and a bare
/// reference such as `=K7` gives `(7, 7)`. Column letters match in either case.
pub fn parse_block_formula(formula: &str) -> Option<(usize, usize)> {
    if let Some(c) = K_RANGE.captures(formula) {
        let start = c[1].parse().ok()?;
        let end = c[2].parse().ok()?;
        return Some((start, end));
    }
    let c = K_CELL.captures(formula)?;
    let row = c[1].parse().ok()?;
    Some((row, row))
}

/// The total formula for a block.
pub fn sum_formula(start_row: usize, end_row: usize) -> String {
    format!("=SUM(K{start_row}:K{end_row})")
}

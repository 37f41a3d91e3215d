//! Finds the first empty row of a block and writes entries into it.

use crate::api::{Grid, Input, Render, Sheet};
use crate::error::Res;
use crate::model::a1;
use crate::model::{is_empty_row, CashoutEntry, MonthBlock};
use anyhow::Context;
use tracing::trace;

/// The first empty row of `block` as a one-based sheet row, or `None` when the block is full.
pub(crate) async fn find_first_empty_row(
    sheet: &dyn Sheet,
    tab: &str,
    block: &MonthBlock,
) -> Res<Option<usize>> {
    let range = a1::range(tab, format!("A{}:K{}", block.start_row, block.end_row));
    let rows = sheet
        .get(&range, Render::Value)
        .await
        .with_context(|| format!("Unable to read block {range}"))?;
    Ok(first_empty_row(&rows, block))
}

/// `rows` holds the block's rows from `start_row` on. Rows past its end are empty.
pub(crate) fn first_empty_row(rows: &Grid, block: &MonthBlock) -> Option<usize> {
    (0..block.capacity())
        .find(|&offset| is_empty_row(rows.get(offset)))
        .map(|offset| block.start_row + offset)
}

/// Writes `entry` over columns A..K of `row`, as user-entered values.
pub(crate) async fn write_entry(
    sheet: &dyn Sheet,
    tab: &str,
    row: usize,
    entry: &CashoutEntry,
) -> Res<()> {
    let range = a1::range(tab, format!("A{row}:K{row}"));
    trace!("Writing entry to {range}");
    sheet
        .update(&range, vec![entry.to_row()], Input::UserEntered)
        .await
        .with_context(|| format!("Unable to write the entry to {range}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sum_formula;
    use serde_json::json;

    fn block(start_row: usize, end_row: usize) -> MonthBlock {
        MonthBlock {
            total_row: end_row + 1,
            label: String::new(),
            formula: sum_formula(start_row, end_row),
            start_row,
            end_row,
        }
    }

    fn occupied() -> Vec<serde_json::Value> {
        vec![json!(45992), json!(""), json!("Semen")]
    }

    #[test]
    fn test_first_empty_row_after_occupied_rows() {
        // Rows 5 to 10 are occupied, row 11 is blank in A, C and K.
        let mut rows: Grid = (5..=10).map(|_| occupied()).collect();
        rows.push(vec![json!(""), json!("note in B"), json!("  ")]);
        rows.push(occupied());
        assert_eq!(first_empty_row(&rows, &block(5, 34)), Some(11));
    }

    #[test]
    fn test_missing_rows_are_empty() {
        let rows: Grid = vec![occupied(), occupied()];
        assert_eq!(first_empty_row(&rows, &block(5, 34)), Some(7));
        assert_eq!(first_empty_row(&Grid::new(), &block(5, 34)), Some(5));
    }

    #[test]
    fn test_amount_alone_occupies_a_row() {
        let mut only_k = vec![json!(""); 10];
        only_k.push(json!(0));
        let rows: Grid = vec![only_k];
        assert_eq!(first_empty_row(&rows, &block(5, 6)), Some(6));
    }

    #[test]
    fn test_full_block() {
        let rows: Grid = vec![occupied(), occupied()];
        assert_eq!(first_empty_row(&rows, &block(2, 3)), None);
    }
}

//! Finds the month blocks of a tab.

use crate::api::{Render, Sheet};
use crate::error::Res;
use crate::model::a1;
use crate::model::{parse_block_formula, Locale, MonthBlock};
use crate::utils::cell_text;
use anyhow::Context;
use tracing::debug;

/// Column L holds each block's total formula.
const TOTAL_COLUMN: &str = "L";

/// Scans column A of `tab` for total rows and recovers each block's range from the formula in
/// column L. Total rows whose formula names no `K` rows are left out. Blocks are returned top to
/// bottom.
pub(crate) async fn find_month_blocks(
    sheet: &dyn Sheet,
    locale: &Locale,
    tab: &str,
) -> Res<Vec<MonthBlock>> {
    let column_a = sheet
        .get(&a1::range(tab, "A:A"), Render::Value)
        .await
        .with_context(|| format!("Unable to read column A of '{tab}'"))?;

    let candidates: Vec<(usize, String)> = column_a
        .iter()
        .enumerate()
        .map(|(ix, row)| (ix + 1, cell_text(row.first())))
        .filter(|(_, label)| locale.is_total_marker(label))
        .collect();

    let mut blocks = Vec::with_capacity(candidates.len());
    for (total_row, label) in candidates {
        let cell = sheet
            .get(
                &a1::range(tab, format!("{TOTAL_COLUMN}{total_row}")),
                Render::Formula,
            )
            .await
            .with_context(|| format!("Unable to read the total formula of '{tab}' row {total_row}"))?;
        let formula = cell_text(cell.first().and_then(|r| r.first()));
        match parse_block_formula(&formula) {
            Some((start_row, end_row)) if start_row > 0 && end_row > 0 => {
                blocks.push(MonthBlock {
                    total_row,
                    label,
                    formula,
                    start_row,
                    end_row,
                });
            }
            _ => debug!("Ignoring total row {total_row} of '{tab}', no block range in '{formula}'"),
        }
    }
    debug!("Found {} month blocks in '{tab}'", blocks.len());
    Ok(blocks)
}

//! Picks, repurposes or creates the month block for a target month.

use crate::api::{Input, Render, Sheet};
use crate::error::Res;
use crate::ledger::locator::find_month_blocks;
use crate::model::a1;
use crate::model::{is_empty_row, sum_formula, Locale, MonthBlock, MonthYear, ROW_WIDTH};
use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

/// How a block was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// A block labelled with the target month already existed.
    Existing,
    /// An unlabelled block was given the target month's label.
    Placeholder,
    /// A new block was added below the last used row.
    Created,
}

serde_plain::derive_display_from_serialize!(Resolution);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedBlock {
    #[serde(flatten)]
    pub block: MonthBlock,
    pub resolution: Resolution,
}

/// Chooses among located blocks without touching the sheet. A block whose label names the target
/// month wins. Otherwise the bottom-most placeholder is taken.
pub(crate) fn pick_block<'a>(
    blocks: &'a [MonthBlock],
    locale: &Locale,
    target: &MonthYear,
) -> Option<(&'a MonthBlock, Resolution)> {
    if let Some(block) = blocks
        .iter()
        .find(|b| locale.label_matches(&b.label, target))
    {
        return Some((block, Resolution::Existing));
    }
    blocks
        .iter()
        .rev()
        .find(|b| locale.parse_label(&b.label).is_none())
        .map(|block| (block, Resolution::Placeholder))
}

/// Returns the block for `target` in `tab`, relabelling a placeholder or creating a block when
/// there is no match.
pub(crate) async fn resolve_block(
    sheet: &dyn Sheet,
    locale: &Locale,
    tab: &str,
    target: &MonthYear,
    reserve_rows: usize,
) -> Res<ResolvedBlock> {
    let blocks = find_month_blocks(sheet, locale, tab).await?;
    let label = locale.total_label(target);

    if let Some((block, resolution)) = pick_block(&blocks, locale, target) {
        let mut block = block.clone();
        if resolution == Resolution::Placeholder {
            let range = a1::range(tab, format!("A{}", block.total_row));
            info!("Labelling placeholder block at {range} as '{label}'");
            sheet
                .update(&range, vec![vec![Value::String(label.clone())]], Input::UserEntered)
                .await
                .with_context(|| format!("Unable to label the placeholder block at {range}"))?;
            block.label = label;
        } else {
            debug!("Using block '{}' at row {} of '{tab}'", block.label, block.total_row);
        }
        return Ok(ResolvedBlock { block, resolution });
    }

    let block = create_month_block(sheet, tab, label, reserve_rows).await?;
    Ok(ResolvedBlock {
        block,
        resolution: Resolution::Created,
    })
}

/// The highest one-based row with anything in A, C or K. An empty tab counts as using row 1.
pub(crate) async fn last_used_row(sheet: &dyn Sheet, tab: &str) -> Res<usize> {
    let rows = sheet
        .get(&a1::range(tab, "A:K"), Render::Value)
        .await
        .with_context(|| format!("Unable to read '{tab}'"))?;
    Ok(rows
        .iter()
        .enumerate()
        .filter(|(_, row)| !is_empty_row(Some(*row)))
        .map(|(ix, _)| ix + 1)
        .last()
        .unwrap_or(1))
}

/// Reserves `reserve_rows` rows starting two rows below the last used row and writes the total
/// row right after them: the label in A and the sum formula in L.
pub(crate) async fn create_month_block(
    sheet: &dyn Sheet,
    tab: &str,
    label: String,
    reserve_rows: usize,
) -> Res<MonthBlock> {
    let last_used = last_used_row(sheet, tab).await?;
    let start_row = last_used + 2;
    let end_row = start_row + reserve_rows.max(1) - 1;
    let total_row = end_row + 1;
    let formula = sum_formula(start_row, end_row);

    let mut row = vec![Value::String(String::new()); ROW_WIDTH + 1];
    row[0] = Value::String(label.clone());
    row[ROW_WIDTH] = Value::String(formula.clone());
    let range = a1::range(tab, format!("A{total_row}:L{total_row}"));
    info!("Creating block '{label}' in '{tab}', rows {start_row} to {end_row}");
    sheet
        .update(&range, vec![row], Input::UserEntered)
        .await
        .with_context(|| format!("Unable to write the total row {range}"))?;

    Ok(MonthBlock {
        total_row,
        label,
        formula,
        start_row,
        end_row,
    })
}

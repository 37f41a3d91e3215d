//! Implements the `Sheet` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! server, top-to-bottom, without using Google Sheets.
//!
//! Cells are stored the way Sheets stores them after input is interpreted: with `USER_ENTERED`,
//! numeric strings become numbers, `YYYY-MM-DD` becomes a date and `=...` becomes a formula.
//! Formulas are not evaluated. They read back as their text with `Render::Formula` and as empty
//! otherwise.

use crate::api::{CopiedFile, Grid, Input, Render, Sheet, Tab};
use crate::error::Res;
use crate::model::a1::{self, A1Range};
use crate::model::dates::{iso_to_serial, sheet_serial_to_iso};
use anyhow::{bail, Context};
use chrono::Utc;
use serde_json::{json, Number, Value};
use std::io::Cursor;
use tokio::sync::Mutex;
use tracing::error;

const TEST_SPREADSHEET_ID: &str = "test-spreadsheet";

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Text(String),
    Number(Number),
    /// A date, as its serial.
    Date(i64),
    Formula(String),
}

impl Cell {
    fn from_input(value: &Value, input: Input) -> Self {
        match value {
            Value::Null => Cell::Empty,
            Value::Number(n) => Cell::Number(n.clone()),
            Value::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Value::String(s) if s.is_empty() => Cell::Empty,
            Value::String(s) => match input {
                Input::Raw => Cell::Text(s.clone()),
                Input::UserEntered => Self::user_entered(s),
            },
            other => Cell::Text(other.to_string()),
        }
    }

    fn user_entered(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        if trimmed.starts_with('=') {
            return Cell::Formula(trimmed.to_string());
        }
        if let Some(serial) = iso_to_serial(trimmed) {
            return Cell::Date(serial);
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Cell::Number(i.into());
        }
        if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
            return Cell::Number(n);
        }
        Cell::Text(s.to_string())
    }

    fn render(&self, render: Render) -> Value {
        match (self, render) {
            (Cell::Empty, _) => Value::String(String::new()),
            (Cell::Text(s), _) => Value::String(s.clone()),
            (Cell::Number(n), Render::Formatted) => Value::String(n.to_string()),
            (Cell::Number(n), _) => Value::Number(n.clone()),
            (Cell::Date(serial), Render::Formatted) => {
                Value::String(sheet_serial_to_iso(*serial as f64))
            }
            (Cell::Date(serial), _) => Value::from(*serial),
            (Cell::Formula(f), Render::Formula) => Value::String(f.clone()),
            (Cell::Formula(_), _) => Value::String(String::new()),
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

#[derive(Debug, Clone)]
struct TestTab {
    id: i64,
    title: String,
    rows: Vec<Vec<Cell>>,
}

impl TestTab {
    fn set(&mut self, row: usize, col: usize, cell: Cell) {
        if self.rows.len() <= row {
            self.rows.resize(row + 1, Vec::new());
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, Cell::Empty);
        }
        cells[col] = cell;
    }

    /// One past the zero-based index of the last row with any content in the column span.
    fn table_end(&self, from_row: usize, start_col: usize, end_col: usize) -> usize {
        self.rows
            .iter()
            .enumerate()
            .skip(from_row)
            .filter(|(_, cells)| {
                cells
                    .iter()
                    .enumerate()
                    .any(|(col, cell)| col >= start_col && col <= end_col && !cell.is_empty())
            })
            .map(|(ix, _)| ix + 1)
            .last()
            .unwrap_or(from_row)
    }
}

#[derive(Debug, Default)]
struct TestData {
    tabs: Vec<TestTab>,
    next_id: i64,
    copies: Vec<CopiedFile>,
}

impl TestData {
    fn tab(&self, title: &str) -> Res<&TestTab> {
        self.tabs
            .iter()
            .find(|t| t.title == title)
            .with_context(|| format!("Unable to parse range: {}", a1::quote_tab(title)))
    }

    fn tab_mut(&mut self, title: &str) -> Res<&mut TestTab> {
        self.tabs
            .iter_mut()
            .find(|t| t.title == title)
            .with_context(|| format!("Unable to parse range: {}", a1::quote_tab(title)))
    }

    fn read(&self, range: &str, render: Render) -> Res<Grid> {
        let range: A1Range = range.parse()?;
        let tab = self.tab(&range.tab)?;
        let first = range.first_row_index();
        let end = range
            .end_row
            .map(|r| r.min(tab.rows.len()))
            .unwrap_or(tab.rows.len());
        let mut grid = Grid::new();
        for cells in tab.rows.iter().take(end).skip(first) {
            let mut out: Vec<Value> = cells
                .iter()
                .enumerate()
                .filter(|(col, _)| *col >= range.start_col && *col <= range.end_col)
                .map(|(_, cell)| cell.render(render))
                .collect();
            while out.last().is_some_and(is_blank_value) {
                out.pop();
            }
            grid.push(out);
        }
        while grid.last().is_some_and(Vec::is_empty) {
            grid.pop();
        }
        Ok(grid)
    }

    fn write(&mut self, range: &str, values: &Grid, input: Input) -> Res<()> {
        let range: A1Range = range.parse()?;
        let first = range.first_row_index();
        if let Some(end_row) = range.end_row {
            if first + values.len() > end_row {
                bail!(
                    "Requested writing within range {}, but tried writing to row {}",
                    a1::range(&range.tab, ""),
                    first + values.len()
                );
            }
        }
        if range.end_col != usize::MAX {
            let width = range.end_col + 1 - range.start_col.min(range.end_col + 1);
            if values.iter().any(|row| row.len() > width) {
                bail!(
                    "Requested writing within range {}, but tried writing past column {}",
                    a1::range(&range.tab, ""),
                    a1::column_letter(range.end_col)
                );
            }
        }
        let tab = self.tab_mut(&range.tab)?;
        for (i, row) in values.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                tab.set(first + i, range.start_col + j, Cell::from_input(value, input));
            }
        }
        Ok(())
    }
}

/// An implementation of the `Sheet` trait that does not use Google sheets. It holds all tabs in
/// memory and, by default, is seeded with a few projects.
#[derive(Debug)]
pub struct TestSheet {
    data: Mutex<TestData>,
}

impl TestSheet {
    /// Creates a `TestSheet` with the given tabs, in order. Cells are interpreted as
    /// `USER_ENTERED` input.
    pub fn new(tabs: Vec<(String, Grid)>) -> Self {
        let mut data = TestData::default();
        for (title, grid) in tabs {
            let rows = grid
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|v| Cell::from_input(v, Input::UserEntered))
                        .collect()
                })
                .collect();
            data.tabs.push(TestTab {
                id: data.next_id,
                title,
                rows,
            });
            data.next_id += 1;
        }
        Self {
            data: Mutex::new(data),
        }
    }

    /// Creates a `TestSheet` from `(title, csv)` pairs.
    pub fn from_csv(tabs: &[(&str, &str)]) -> Res<Self> {
        let mut loaded = Vec::new();
        for (title, csv_data) in tabs {
            let grid = load_csv(csv_data).with_context(|| format!("Bad seed data for {title}"))?;
            loaded.push((title.to_string(), grid));
        }
        Ok(Self::new(loaded))
    }

    /// The Drive copies made so far.
    pub async fn copies(&self) -> Vec<CopiedFile> {
        self.data.lock().await.copies.clone()
    }
}

impl Default for TestSheet {
    /// Loads seed data from this module.
    fn default() -> Self {
        Self::from_csv(&[
            ("Sheet1", REKAP_DATA),
            ("_PROJECTS", PROJECTS_DATA),
            ("Renovasi Rumah Budi", RUMAH_BUDI_DATA),
            ("Kantor PT Maju", KANTOR_DATA),
        ])
        .unwrap_or_else(|e| {
            error!("Unable to load the seed data: {e:#}");
            Self::new(Vec::new())
        })
    }
}

#[async_trait::async_trait]
impl Sheet for TestSheet {
    async fn get(&self, range: &str, render: Render) -> Res<Grid> {
        self.data.lock().await.read(range, render)
    }

    async fn batch_get(&self, ranges: &[String], render: Render) -> Res<Vec<Grid>> {
        let data = self.data.lock().await;
        ranges.iter().map(|r| data.read(r, render)).collect()
    }

    async fn update(&self, range: &str, values: Grid, input: Input) -> Res<()> {
        self.data.lock().await.write(range, &values, input)
    }

    async fn append(&self, range: &str, values: Grid, input: Input) -> Res<Value> {
        let parsed: A1Range = range.parse()?;
        let mut data = self.data.lock().await;
        let tab = data.tab(&parsed.tab)?;
        let start = tab.table_end(parsed.first_row_index(), parsed.start_col, parsed.end_col);
        let width = values.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let target = format!(
            "{}{}:{}{}",
            a1::column_letter(parsed.start_col),
            start + 1,
            a1::column_letter(parsed.start_col + width - 1),
            start + values.len().max(1)
        );
        let target = a1::range(&parsed.tab, target);
        data.write(&target, &values, input)?;
        Ok(json!({
            "spreadsheetId": TEST_SPREADSHEET_ID,
            "updates": {
                "updatedRange": target,
                "updatedRows": values.len(),
            }
        }))
    }

    async fn clear(&self, range: &str) -> Res<()> {
        let range: A1Range = range.parse()?;
        let mut data = self.data.lock().await;
        let tab = data.tab_mut(&range.tab)?;
        let first = range.first_row_index();
        let end = range.end_row.unwrap_or(usize::MAX);
        for cells in tab.rows.iter_mut().take(end).skip(first) {
            for (col, cell) in cells.iter_mut().enumerate() {
                if col >= range.start_col && col <= range.end_col {
                    *cell = Cell::Empty;
                }
            }
        }
        Ok(())
    }

    async fn tabs(&self) -> Res<Vec<Tab>> {
        let data = self.data.lock().await;
        Ok(data
            .tabs
            .iter()
            .map(|t| Tab {
                id: t.id,
                title: t.title.clone(),
            })
            .collect())
    }

    async fn add_tab(&self, title: &str) -> Res<Tab> {
        let mut data = self.data.lock().await;
        if data.tabs.iter().any(|t| t.title == title) {
            bail!("A sheet with the name \"{title}\" already exists. Please enter another name.");
        }
        let id = data.next_id;
        data.next_id += 1;
        data.tabs.push(TestTab {
            id,
            title: title.to_string(),
            rows: Vec::new(),
        });
        Ok(Tab {
            id,
            title: title.to_string(),
        })
    }

    async fn delete_tab(&self, id: i64) -> Res<()> {
        let mut data = self.data.lock().await;
        let before = data.tabs.len();
        data.tabs.retain(|t| t.id != id);
        if data.tabs.len() == before {
            bail!("No grid with id: {id}");
        }
        Ok(())
    }

    async fn copy_spreadsheet(&self, name: &str, folder_id: &str) -> Res<CopiedFile> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let file = CopiedFile {
            web_view_link: Some(format!(
                "https://docs.google.com/spreadsheets/d/{id}/edit?folder={folder_id}"
            )),
            id,
            name: name.to_string(),
            created_time: Some(Utc::now().to_rfc3339()),
        };
        self.data.lock().await.copies.push(file.clone());
        Ok(file)
    }
}

fn is_blank_value(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty())
}

/// Loads data from a CSV-formatted string. Rows may differ in length.
fn load_csv(csv_data: &str) -> Res<Grid> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(Cursor::new(csv_data.as_bytes()));

    let mut rows = Grid::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(
            record
                .iter()
                .map(|field| Value::String(field.to_string()))
                .collect(),
        );
    }
    Ok(rows)
}

/// Seed data for the raw "rekap" tab.
const REKAP_DATA: &str = r##"Tanggal,Keterangan,Jumlah
2025-11-03,Pembelian semen,250000
2025-11-05,Upah tukang,1500000
"##;

/// Seed project metadata.
const PROJECTS_DATA: &str = r##"project,client,status,startDate,progress
Renovasi Rumah Budi,Pak Budi,Ongoing,2025-10-01,40
"##;

/// Seed project with a November 2025 block (rows 2-6, two entries) and a placeholder block
/// (rows 9-13).
const RUMAH_BUDI_DATA: &str = r##"Tanggal,,Keterangan,,,Cash,Debit,Transfer,Kartu Kredit,,Jumlah,Total
2025-11-03,,Semen 20 sak,,,√,,,,,1300000,
2025-11-10,,Cat tembok,,,,,√,,,850000,
,
,
,
Total Pengeluaran Bulan November 2025,,,,,,,,,,,=SUM(K2:K6)
,
,
,
,
,
,
Total Pengeluaran Bulan,,,,,,,,,,,=SUM(K9:K13)
"##;

/// Seed project whose only block, October 2025, is full.
const KANTOR_DATA: &str = r##"Tanggal,,Keterangan,,,Cash,Debit,Transfer,Kartu Kredit,,Jumlah,Total
2025-10-02,,Keramik,,,,√,,,,2000000,
2025-10-09,,Lem keramik,,,,,,√,,350000,
Total Pengeluaran Bulan Oktober 2025,,,,,,,,,,,=SUM(K2:K3)
"##;

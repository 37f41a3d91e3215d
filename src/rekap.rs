//! Raw access to the recap tab named by `sheet_name` in the config.

use crate::api::{Grid, Input, Render, Sheet};
use crate::error::{ErrorType, IntoResult, Result};
use crate::model::a1;
use crate::Error;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Every column the recap endpoints read and write.
const COLUMNS: &str = "A:Z";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RekapRows {
    pub row_count: usize,
    pub rows: Grid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appended {
    pub appended: Vec<Value>,
    /// The API reply, as returned by Google.
    pub raw_result: Value,
}

pub struct Rekap {
    sheet: Arc<dyn Sheet>,
    tab: String,
}

impl Rekap {
    pub fn new(sheet: Arc<dyn Sheet>, tab: &str) -> Self {
        Self {
            sheet,
            tab: tab.to_string(),
        }
    }

    /// All rows as displayed in the sheet.
    pub async fn rows(&self) -> Result<RekapRows> {
        let rows = self
            .sheet
            .get(&a1::range(&self.tab, COLUMNS), Render::Formatted)
            .await
            .pub_result(ErrorType::Service)?;
        Ok(RekapRows {
            row_count: rows.len(),
            rows,
        })
    }

    /// Appends one row below the table. `body` is either `{"row": [...]}` or an object whose
    /// values, in order, form the row.
    pub async fn append(&self, body: &Value) -> Result<Appended> {
        let row = row_from_body(body);
        if row.is_empty() {
            return Err(Error::msg(
                ErrorType::Request,
                "The body is empty or is not a row",
            ));
        }
        let raw_result = self
            .sheet
            .append(
                &a1::range(&self.tab, COLUMNS),
                vec![row.clone()],
                Input::UserEntered,
            )
            .await
            .pub_result(ErrorType::Service)?;
        info!("Appended a row of {} cells to '{}'", row.len(), self.tab);
        Ok(Appended {
            appended: row,
            raw_result,
        })
    }
}

fn row_from_body(body: &Value) -> Vec<Value> {
    match body {
        Value::Object(map) => match map.get("row") {
            Some(Value::Array(row)) => row.clone(),
            _ => map.values().cloned().collect(),
        },
        Value::Array(row) => row.clone(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestSheet;
    use serde_json::json;

    fn rekap() -> Rekap {
        Rekap::new(Arc::new(TestSheet::default()), "Sheet1")
    }

    #[test]
    fn test_row_from_body() {
        assert_eq!(row_from_body(&json!({"row": [1, "a"]})), vec![json!(1), json!("a")]);
        assert_eq!(
            row_from_body(&json!({"tanggal": "2025-12-01", "jumlah": 5})),
            vec![json!("2025-12-01"), json!(5)]
        );
        assert!(row_from_body(&json!({})).is_empty());
        assert!(row_from_body(&json!("text")).is_empty());
    }

    #[tokio::test]
    async fn test_rows() {
        let rows = rekap().rows().await.unwrap();
        assert_eq!(rows.row_count, 3);
        assert_eq!(rows.rows[1], vec![json!("2025-11-03"), json!("Pembelian semen"), json!("250000")]);
    }

    #[tokio::test]
    async fn test_append() {
        let rekap = rekap();
        let appended = rekap
            .append(&json!({"row": ["2025-12-01", "Cat", "500000"]}))
            .await
            .unwrap();
        assert_eq!(appended.appended.len(), 3);
        assert_eq!(
            appended.raw_result["updates"]["updatedRange"],
            json!("'Sheet1'!A4:C4")
        );
        let rows = rekap.rows().await.unwrap();
        assert_eq!(rows.row_count, 4);

        let err = rekap.append(&json!({"row": []})).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
    }
}

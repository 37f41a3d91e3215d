//! Cashout rows as they are laid out in a project tab.
//!
//! | column | index | content |
//! |---|---|---|
//! | A | 0 | date |
//! | C | 2 | description ("pengeluaran") |
//! | F, G, H, I | 5..=8 | `√` in exactly one: cash, debit, transfer, kartu kredit |
//! | K | 10 | amount |
//! | L | 11 | monthly total formula, on total rows only |

use crate::model::dates::normalize_sheet_date;
use crate::model::Amount;
use crate::utils::{cell_text, is_blank};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const COL_DATE: usize = 0;
pub const COL_DESCRIPTION: usize = 2;
pub const COL_AMOUNT: usize = 10;
/// Entry rows span A through K.
pub const ROW_WIDTH: usize = 11;
pub const CHECKMARK: &str = "√";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "cash")]
    Cash,
    #[serde(rename = "debit")]
    Debit,
    #[default]
    #[serde(rename = "transfer")]
    Transfer,
    #[serde(rename = "kartu kredit", alias = "kartu_kredit")]
    KartuKredit,
}

serde_plain::derive_display_from_serialize!(PaymentMethod);
serde_plain::derive_fromstr_from_deserialize!(PaymentMethod);

const METHODS: [PaymentMethod; 4] = [
    PaymentMethod::Cash,
    PaymentMethod::Debit,
    PaymentMethod::Transfer,
    PaymentMethod::KartuKredit,
];

impl PaymentMethod {
    /// Reads the method from request input. Unknown or missing input means transfer.
    pub fn from_input(raw: Option<&str>) -> Self {
        let lower = raw.unwrap_or_default().trim().to_lowercase();
        lower.parse().unwrap_or_default()
    }

    /// The column that gets the checkmark.
    pub fn column(&self) -> usize {
        match self {
            PaymentMethod::Cash => 5,
            PaymentMethod::Debit => 6,
            PaymentMethod::Transfer => 7,
            PaymentMethod::KartuKredit => 8,
        }
    }

    /// The first method whose column holds a checkmark.
    pub fn from_row(row: &[Value]) -> Option<Self> {
        METHODS
            .into_iter()
            .find(|m| cell_text(row.get(m.column())) == CHECKMARK)
    }
}

/// A new entry, validated and ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashoutEntry {
    /// `YYYY-MM-DD`
    pub date: String,
    pub pengeluaran: String,
    pub metode: PaymentMethod,
    pub amount: Amount,
}

impl CashoutEntry {
    /// The eleven cells A..K for this entry.
    pub fn to_row(&self) -> Vec<Value> {
        let mut row = vec![Value::String(String::new()); ROW_WIDTH];
        row[COL_DATE] = Value::String(self.date.clone());
        row[COL_DESCRIPTION] = Value::String(self.pengeluaran.clone());
        row[self.metode.column()] = Value::String(CHECKMARK.to_string());
        row[COL_AMOUNT] = self.amount.to_cell();
        row
    }
}

/// An entry read back from a tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashoutItem {
    pub sheet_row: usize,
    pub date: String,
    pub pengeluaran: String,
    /// Empty when no method column is checked.
    pub metode: String,
    pub amount: Amount,
}

impl CashoutItem {
    /// Reads the row at zero-based `index`. Rows without a usable date or a positive amount are
    /// not entries.
    pub fn from_row(index: usize, row: &[Value]) -> Option<Self> {
        let date = normalize_sheet_date(row.get(COL_DATE));
        if date.is_empty() {
            return None;
        }
        let amount = Amount::from_cell(row.get(COL_AMOUNT));
        if !amount.is_positive() {
            return None;
        }
        Some(Self {
            sheet_row: index + 1,
            date,
            pengeluaran: cell_text(row.get(COL_DESCRIPTION)),
            metode: PaymentMethod::from_row(row)
                .map(|m| m.to_string())
                .unwrap_or_default(),
            amount,
        })
    }
}

/// A row is empty when A, C and K are all blank. Anything else counts as occupied.
pub fn is_empty_row(row: Option<&Vec<Value>>) -> bool {
    match row {
        None => true,
        Some(r) => {
            is_blank(r.get(COL_DATE)) && is_blank(r.get(COL_DESCRIPTION)) && is_blank(r.get(COL_AMOUNT))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_from_input() {
        assert_eq!(PaymentMethod::from_input(Some("cash")), PaymentMethod::Cash);
        assert_eq!(PaymentMethod::from_input(Some(" Debit ")), PaymentMethod::Debit);
        assert_eq!(
            PaymentMethod::from_input(Some("kartu kredit")),
            PaymentMethod::KartuKredit
        );
        assert_eq!(
            PaymentMethod::from_input(Some("kartu_kredit")),
            PaymentMethod::KartuKredit
        );
        assert_eq!(PaymentMethod::from_input(Some("qris")), PaymentMethod::Transfer);
        assert_eq!(PaymentMethod::from_input(None), PaymentMethod::Transfer);
    }

    #[test]
    fn test_method_display() {
        assert_eq!(PaymentMethod::KartuKredit.to_string(), "kartu kredit");
        assert_eq!(PaymentMethod::Cash.to_string(), "cash");
    }

    #[test]
    fn test_to_row() {
        let entry = CashoutEntry {
            date: "2025-12-01".into(),
            pengeluaran: "Cat".into(),
            metode: PaymentMethod::Cash,
            amount: Amount::parse("500000"),
        };
        let row = entry.to_row();
        assert_eq!(row.len(), 11);
        assert_eq!(row[0], json!("2025-12-01"));
        assert_eq!(row[2], json!("Cat"));
        assert_eq!(row[5], json!("√"));
        assert_eq!(row[6], json!(""));
        assert_eq!(row[7], json!(""));
        assert_eq!(row[10], json!(500000));
    }

    #[test]
    fn test_item_from_row() {
        let row = vec![
            json!(45992),
            json!(""),
            json!("Semen"),
            json!(""),
            json!(""),
            json!(""),
            json!("√"),
            json!(""),
            json!(""),
            json!(""),
            json!(250000),
        ];
        let item = CashoutItem::from_row(9, &row).unwrap();
        assert_eq!(item.sheet_row, 10);
        assert_eq!(item.date, "2025-12-01");
        assert_eq!(item.pengeluaran, "Semen");
        assert_eq!(item.metode, "debit");
        assert_eq!(item.amount, Amount::parse("250000"));
    }

    #[test]
    fn test_item_requires_date_and_positive_amount() {
        let no_amount = vec![json!("2025-12-01"), json!(""), json!("Semen")];
        assert!(CashoutItem::from_row(0, &no_amount).is_none());
        let label = vec![json!("Total Pengeluaran Bulan Desember 2025")];
        assert!(CashoutItem::from_row(0, &label).is_none());
    }

    #[test]
    fn test_is_empty_row() {
        assert!(is_empty_row(None));
        assert!(is_empty_row(Some(&vec![])));
        assert!(is_empty_row(Some(&vec![json!(""), json!("x"), json!(" ")])));
        assert!(!is_empty_row(Some(&vec![json!(""), json!(""), json!("Cat")])));
        let mut only_k = vec![json!(""); 11];
        only_k[10] = json!(0);
        assert!(!is_empty_row(Some(&only_k)));
    }
}

//! Types that represent the core data model: amounts, dates, month blocks, cashout rows and
//! project metadata.
pub(crate) mod a1;
mod amount;
mod block;
mod cashout;
pub(crate) mod dates;
mod locale;
mod project;

pub use amount::Amount;
pub use block::{parse_block_formula, sum_formula, MonthBlock};
pub use cashout::{
    is_empty_row, CashoutEntry, CashoutItem, PaymentMethod, CHECKMARK, COL_AMOUNT, COL_DATE,
    COL_DESCRIPTION, ROW_WIDTH,
};
pub use dates::{normalize_date, normalize_sheet_date, sheet_serial_to_iso};
pub use locale::{LabelMonth, Locale, MonthYear};
pub use project::{
    header_row, Project, ProjectFields, ProjectMeta, DEFAULT_CLIENT, DEFAULT_STATUS, META_HEADER,
    META_SHEET,
};

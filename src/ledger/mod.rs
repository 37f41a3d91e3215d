//! Month-block bookkeeping for project tabs.
//!
//! A project tab is split into month blocks: runs of entry rows closed by a total row whose column
//! A reads `Total Pengeluaran Bulan <Month> <Year>` and whose column L holds `=SUM(K<s>:K<e>)`.
//! The formula is the only record of where a block starts and ends.
//!
//! Adding a cashout resolves the block for the entry's month, finds its first empty row and writes
//! the entry there. That sequence runs under a per-tab lock so that two entries for the same tab
//! never land on the same row. Different tabs are not serialized against each other.

mod locator;
mod resolver;
mod writer;

use crate::api::{Render, Sheet};
use crate::error::{ErrorType, IntoResult, Result};
use crate::model::a1;
use crate::model::dates::{is_month_key, month_key, parse_iso};
use crate::model::{
    normalize_date, Amount, CashoutEntry, CashoutItem, Locale, MonthBlock, PaymentMethod,
};
use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

pub(crate) use locator::find_month_blocks;
pub use resolver::{Resolution, ResolvedBlock};

/// Rows reserved for a new month block unless configured otherwise.
pub const DEFAULT_RESERVE_ROWS: usize = 30;

/// A cashout as submitted by a client. Everything is optional so that missing fields can be
/// reported one by one.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashoutRequest {
    #[serde(default)]
    pub project_sheet: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub pengeluaran: Option<String>,
    #[serde(default)]
    pub metode: Option<String>,
    /// A number, or a string such as `"Rp 1.250.000"`.
    #[serde(default)]
    pub amount: Option<Value>,
}

/// The outcome of a successful `Ledger::add_cashout`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashoutWritten {
    pub sheet: String,
    pub row_index: usize,
    pub block: ResolvedBlock,
    pub data: CashoutEntry,
}

/// Entries of one tab for one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashoutList {
    pub project_sheet: String,
    pub month: String,
    pub count: usize,
    pub total: Amount,
    pub items: Vec<CashoutItem>,
}

/// Spend of one tab per `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashoutSummary {
    pub project_sheet: String,
    pub by_month: BTreeMap<String, Amount>,
}

type LockMap = StdMutex<HashMap<String, Arc<Mutex<()>>>>;

/// One async mutex per tab name, created on first use and removed when its last holder or waiter
/// is gone.
#[derive(Debug, Default)]
struct TabLocks {
    locks: Arc<LockMap>,
}

impl TabLocks {
    async fn lock(&self, tab: &str) -> TabGuard {
        let lock = {
            let mut locks = lock_map(&self.locks);
            locks.entry(tab.to_string()).or_default().clone()
        };
        let guard = lock.clone().lock_owned().await;
        TabGuard {
            tab: tab.to_string(),
            lock,
            guard: Some(guard),
            locks: self.locks.clone(),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        lock_map(&self.locks).len()
    }
}

/// Holds a tab's lock. Dropping it releases the lock and forgets the tab when nobody else wants it.
struct TabGuard {
    tab: String,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
}

impl Drop for TabGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = lock_map(&self.locks);
        // Only the map and this guard still point at the mutex: no task is waiting on it.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.tab);
        }
    }
}

fn lock_map(locks: &LockMap) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
    locks.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reads and writes cashout entries in project tabs.
pub struct Ledger {
    sheet: Arc<dyn Sheet>,
    locale: Locale,
    reserve_rows: usize,
    locks: TabLocks,
}

impl Ledger {
    pub fn new(sheet: Arc<dyn Sheet>, locale: Locale, reserve_rows: usize) -> Self {
        Self {
            sheet,
            locale,
            reserve_rows: reserve_rows.max(1),
            locks: TabLocks::default(),
        }
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Validates `request` and writes it into the first empty row of its month's block.
    ///
    /// Validation happens before any remote call. A full block is reported as `ErrorType::Full`
    /// and is never grown.
    pub async fn add_cashout(&self, request: CashoutRequest) -> Result<CashoutWritten> {
        let tab = required(request.project_sheet.as_deref(), "projectSheet (the project tab name)")?;
        let date = normalize_date(request.date.as_deref().unwrap_or_default());
        if date.is_empty() {
            return Err(Error::msg(ErrorType::Request, "date is required"));
        }
        if parse_iso(&date).is_none() {
            return Err(Error::msg(
                ErrorType::Request,
                format!("date '{date}' is not a valid YYYY-MM-DD or DD/MM/YYYY date"),
            ));
        }
        let pengeluaran = required(request.pengeluaran.as_deref(), "pengeluaran (description)")?;
        let amount = Amount::from_cell(request.amount.as_ref());
        if !amount.is_positive() {
            return Err(Error::msg(
                ErrorType::Request,
                "amount must be a number greater than 0",
            ));
        }
        let target = self.locale.month_year(&date).ok_or_else(|| {
            Error::msg(ErrorType::Request, format!("date '{date}' has no month"))
        })?;
        let entry = CashoutEntry {
            date,
            pengeluaran,
            metode: PaymentMethod::from_input(request.metode.as_deref()),
            amount,
        };

        let _guard = self.locks.lock(&tab).await;
        let sheet = self.sheet.as_ref();
        let resolved =
            resolver::resolve_block(sheet, &self.locale, &tab, &target, self.reserve_rows)
                .await
                .pub_result(ErrorType::Service)?;
        let row = writer::find_first_empty_row(sheet, &tab, &resolved.block)
            .await
            .pub_result(ErrorType::Service)?
            .ok_or_else(|| {
                Error::msg(
                    ErrorType::Full,
                    format!(
                        "The block for {} {} is full",
                        target.month_name, target.year
                    ),
                )
            })?;
        writer::write_entry(sheet, &tab, row, &entry)
            .await
            .pub_result(ErrorType::Service)?;
        info!(
            "Wrote {} ({}) to '{tab}' row {row}",
            entry.pengeluaran, entry.amount
        );

        Ok(CashoutWritten {
            sheet: tab,
            row_index: row,
            block: resolved,
            data: entry,
        })
    }

    /// The entries of `tab` dated in `month` (`YYYY-MM`), sorted by date.
    pub async fn list_cashout(&self, tab: &str, month: &str) -> Result<CashoutList> {
        let tab = required(Some(tab), "projectSheet")?;
        let month = month.trim();
        if !is_month_key(month) {
            return Err(Error::msg(
                ErrorType::Request,
                "month must be formatted as YYYY-MM, for example 2025-12",
            ));
        }
        let mut items: Vec<CashoutItem> = self
            .read_items(&tab)
            .await?
            .into_iter()
            .filter(|item| month_key(&item.date) == Some(month))
            .collect();
        items.sort_by(|a, b| a.date.cmp(&b.date));
        let total = items.iter().map(|item| item.amount).sum();
        Ok(CashoutList {
            project_sheet: tab,
            month: month.to_string(),
            count: items.len(),
            total,
            items,
        })
    }

    /// Total spend of `tab` per month.
    pub async fn summary(&self, tab: &str) -> Result<CashoutSummary> {
        let tab = required(Some(tab), "projectSheet")?;
        let mut by_month: BTreeMap<String, Amount> = BTreeMap::new();
        for item in self.read_items(&tab).await? {
            if let Some(key) = month_key(&item.date) {
                let sum = by_month.entry(key.to_string()).or_default();
                *sum = *sum + item.amount;
            }
        }
        Ok(CashoutSummary {
            project_sheet: tab,
            by_month,
        })
    }

    /// The month blocks of `tab`, top to bottom.
    pub async fn blocks(&self, tab: &str) -> Result<Vec<MonthBlock>> {
        find_month_blocks(self.sheet.as_ref(), &self.locale, tab)
            .await
            .pub_result(ErrorType::Service)
    }

    async fn read_items(&self, tab: &str) -> Result<Vec<CashoutItem>> {
        let rows = self
            .sheet
            .get(&a1::range(tab, "A:K"), Render::Value)
            .await
            .pub_result(ErrorType::Service)?;
        let items: Vec<CashoutItem> = rows
            .iter()
            .enumerate()
            .filter_map(|(ix, row)| CashoutItem::from_row(ix, row))
            .collect();
        debug!("Read {} entries from '{tab}'", items.len());
        Ok(items)
    }
}

fn required(value: Option<&str>, name: &str) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Error::msg(ErrorType::Request, format!("{name} is required"))),
    }
}

//! The dashboard overview: spend per month across project tabs, with KPIs and chart series.
//!
//! All project tabs in scope are read with a single batched call. A row counts when its column A
//! holds a date and its column K a positive amount. Overviews are cached per scope for the
//! configured TTL and the cache is not invalidated by writes.

mod cache;
mod stats;

use crate::api::{Render, Sheet};
use crate::error::{ErrorType, IntoResult, Result};
use crate::model::a1;
use crate::model::dates::{month_key, month_key_of};
use crate::model::{normalize_sheet_date, Amount, COL_AMOUNT, COL_DATE, META_SHEET};
use chrono::TimeDelta;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use stats::{last_12_month_keys, month_label, moving_average, pct_change, previous_month};

/// The scope that covers every project tab.
pub const ALL: &str = "all";
pub const DEFAULT_TTL_SECS: u64 = 60;
const AVERAGE_WINDOW: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    pub total_projects: usize,
    pub monthly_spending: f64,
    pub monthly_spending_pct: Option<f64>,
    pub ongoing_projects: usize,
    pub near_completion: usize,
    pub total_expenses: f64,
    pub total_entries: usize,
    pub expenses_note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineChart {
    pub labels: Vec<String>,
    pub green_label: String,
    pub green: Vec<f64>,
    pub red_label: String,
    pub red: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Charts {
    pub bar: BarChart,
    pub line: LineChart,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub scope: String,
    /// Every project tab, whatever the scope.
    pub projects: Vec<String>,
    pub kpi: Kpi,
    pub charts: Charts,
}

/// The answer to an overview request.
#[derive(Debug, Clone, PartialEq)]
pub enum OverviewReply {
    Found(Overview),
    /// The requested project has no tab. Carries the tabs that do exist.
    UnknownProject { projects: Vec<String> },
}

/// One accepted row.
#[derive(Debug, Clone, PartialEq)]
struct Spend {
    project: String,
    month: String,
    amount: Amount,
}

pub struct Dashboard {
    sheet: Arc<dyn Sheet>,
    clock: Arc<dyn Clock>,
    cache: TtlCache<String, Overview>,
}

impl Dashboard {
    pub fn new(sheet: Arc<dyn Sheet>, ttl: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self {
            sheet,
            cache: TtlCache::new(ttl, clock.clone()),
            clock,
        }
    }

    /// Builds, or returns the cached, overview for `project`. `None`, empty and `all` mean every
    /// project tab.
    pub async fn overview(&self, project: Option<&str>) -> Result<OverviewReply> {
        let scope = match project.map(str::trim) {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => ALL.to_string(),
        };

        let projects: Vec<String> = self
            .sheet
            .tabs()
            .await
            .pub_result(ErrorType::Service)?
            .into_iter()
            .map(|t| t.title)
            .filter(|t| t != META_SHEET)
            .collect();
        let selected: Vec<String> = if scope == ALL {
            projects.clone()
        } else {
            projects.iter().filter(|p| **p == scope).cloned().collect()
        };
        if selected.is_empty() {
            return Ok(OverviewReply::UnknownProject { projects });
        }

        let key = format!("dashboard:{scope}");
        if let Some(cached) = self.cache.get(&key).await {
            debug!("Dashboard cache hit for {key}");
            return Ok(OverviewReply::Found(cached));
        }

        let ranges: Vec<String> = selected.iter().map(|t| a1::range(t, "A:K")).collect();
        let grids = self
            .sheet
            .batch_get(&ranges, Render::Value)
            .await
            .pub_result(ErrorType::Service)?;
        let mut spend = Vec::new();
        for (project, grid) in selected.iter().zip(grids) {
            for row in grid {
                let date = normalize_sheet_date(row.get(COL_DATE));
                let amount = Amount::from_cell(row.get(COL_AMOUNT));
                if date.is_empty() || !amount.is_positive() {
                    continue;
                }
                if let Some(month) = month_key(&date) {
                    spend.push(Spend {
                        project: project.clone(),
                        month: month.to_string(),
                        amount,
                    });
                }
            }
        }
        debug!("Dashboard {key}: {} rows from {} tabs", spend.len(), selected.len());

        let overview = build_overview(
            scope,
            projects,
            selected.len(),
            &spend,
            self.clock.now().date_naive(),
        );
        self.cache.insert(key, overview.clone()).await;
        Ok(OverviewReply::Found(overview))
    }
}

fn build_overview(
    scope: String,
    projects: Vec<String>,
    total_projects: usize,
    spend: &[Spend],
    today: chrono::NaiveDate,
) -> Overview {
    let this_month = month_key_of(today);
    let prev_month = month_key_of(previous_month(today));
    let sum_of = |month: &str| -> Amount {
        spend
            .iter()
            .filter(|s| s.month == month)
            .map(|s| s.amount)
            .sum()
    };
    let monthly = sum_of(&this_month).to_f64();
    let previous = sum_of(&prev_month).to_f64();
    let ongoing: BTreeSet<&str> = spend
        .iter()
        .filter(|s| s.month == this_month)
        .map(|s| s.project.as_str())
        .collect();
    let total: Amount = spend.iter().map(|s| s.amount).sum();

    let keys = last_12_month_keys(today);
    let mut by_month: HashMap<&str, Amount> = keys.iter().map(|k| (k.as_str(), Amount::ZERO)).collect();
    for s in spend {
        if let Some(sum) = by_month.get_mut(s.month.as_str()) {
            *sum = *sum + s.amount;
        }
    }
    let expenses: Vec<f64> = keys
        .iter()
        .map(|k| by_month.get(k.as_str()).copied().unwrap_or_default().to_f64())
        .collect();
    let labels: Vec<String> = keys.iter().map(|k| month_label(k)).collect();
    let average = moving_average(&expenses, AVERAGE_WINDOW);

    Overview {
        scope,
        projects,
        kpi: Kpi {
            total_projects,
            monthly_spending: monthly,
            monthly_spending_pct: pct_change(monthly, previous),
            ongoing_projects: ongoing.len(),
            near_completion: total_projects.saturating_sub(ongoing.len()),
            total_expenses: total.to_f64(),
            total_entries: spend.len(),
            expenses_note: "Monitor carefully".to_string(),
        },
        charts: Charts {
            bar: BarChart {
                labels: labels.clone(),
                data: expenses.clone(),
                label: "Expenses".to_string(),
            },
            line: LineChart {
                labels,
                green_label: "Avg (3 mo)".to_string(),
                green: average,
                red_label: "Expenses".to_string(),
                red: expenses,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Input, TestSheet};
    use chrono::{Local, TimeZone};
    use serde_json::json;

    fn clock() -> Arc<ManualClock> {
        let now = Local.with_ymd_and_hms(2025, 11, 20, 10, 0, 0).unwrap();
        Arc::new(ManualClock::new(now))
    }

    fn dashboard(sheet: Arc<TestSheet>, clock: Arc<ManualClock>) -> Dashboard {
        Dashboard::new(sheet, TimeDelta::seconds(60), clock)
    }

    fn found(reply: OverviewReply) -> Overview {
        match reply {
            OverviewReply::Found(o) => o,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_overview_all() {
        let d = dashboard(Arc::new(TestSheet::default()), clock());
        let o = found(d.overview(None).await.unwrap());
        assert_eq!(o.scope, "all");
        assert_eq!(
            o.projects,
            vec!["Sheet1", "Renovasi Rumah Budi", "Kantor PT Maju"]
        );
        let kpi = &o.kpi;
        assert_eq!(kpi.total_projects, 3);
        assert_eq!(kpi.monthly_spending, 2_150_000.0);
        // October: 2,350,000. November: 2,150,000.
        let pct = kpi.monthly_spending_pct.unwrap();
        assert!((pct - (-200_000.0 / 2_350_000.0 * 100.0)).abs() < 1e-9);
        assert_eq!(kpi.ongoing_projects, 1);
        assert_eq!(kpi.near_completion, 2);
        assert_eq!(kpi.total_expenses, 4_500_000.0);
        assert_eq!(kpi.total_entries, 4);
        assert_eq!(kpi.expenses_note, "Monitor carefully");

        let bar = &o.charts.bar;
        assert_eq!(bar.labels.len(), 12);
        assert_eq!(bar.labels[11], "Nov");
        assert_eq!(bar.labels[0], "Dec");
        assert_eq!(bar.data[10], 2_350_000.0);
        assert_eq!(bar.data[11], 2_150_000.0);
        assert_eq!(o.charts.line.green[11], (2_350_000.0 + 2_150_000.0) / 3.0);
    }

    #[tokio::test]
    async fn test_overview_one_project() {
        let d = dashboard(Arc::new(TestSheet::default()), clock());
        let o = found(d.overview(Some("Kantor PT Maju")).await.unwrap());
        assert_eq!(o.scope, "Kantor PT Maju");
        assert_eq!(o.projects.len(), 3);
        assert_eq!(o.kpi.total_projects, 1);
        assert_eq!(o.kpi.monthly_spending, 0.0);
        assert_eq!(o.kpi.monthly_spending_pct, Some(-100.0));
        assert_eq!(o.kpi.ongoing_projects, 0);
        assert_eq!(o.kpi.near_completion, 1);
    }

    #[tokio::test]
    async fn test_unknown_project() {
        let d = dashboard(Arc::new(TestSheet::default()), clock());
        let reply = d.overview(Some("Nope")).await.unwrap();
        let OverviewReply::UnknownProject { projects } = reply else {
            panic!("expected an unknown project");
        };
        assert_eq!(projects.len(), 3);
        // The metadata tab is never a project.
        let reply = d.overview(Some(META_SHEET)).await.unwrap();
        assert!(matches!(reply, OverviewReply::UnknownProject { .. }));
    }

    #[tokio::test]
    async fn test_cached_until_ttl() {
        let sheet = Arc::new(TestSheet::default());
        let clock = clock();
        let d = dashboard(sheet.clone(), clock.clone());
        let before = found(d.overview(Some("all")).await.unwrap());

        sheet
            .update(
                "'Renovasi Rumah Budi'!A4:K4",
                vec![vec![
                    json!("2025-11-21"),
                    json!(""),
                    json!("Pasir"),
                    json!(""),
                    json!(""),
                    json!(""),
                    json!(""),
                    json!("√"),
                    json!(""),
                    json!(""),
                    json!("100000"),
                ]],
                Input::UserEntered,
            )
            .await
            .unwrap();

        clock.advance(TimeDelta::seconds(30));
        let cached = found(d.overview(None).await.unwrap());
        assert_eq!(cached, before);

        clock.advance(TimeDelta::seconds(30));
        let fresh = found(d.overview(None).await.unwrap());
        assert_eq!(fresh.kpi.total_entries, 5);
        assert_eq!(fresh.kpi.monthly_spending, 2_250_000.0);
    }

    #[test]
    fn test_no_previous_spend_has_no_pct() {
        let spend = vec![Spend {
            project: "P".into(),
            month: "2025-11".into(),
            amount: Amount::parse("100"),
        }];
        let today = chrono::NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let o = build_overview("all".into(), vec!["P".into()], 1, &spend, today);
        assert_eq!(o.kpi.monthly_spending_pct, None);
        assert_eq!(o.charts.line.green[11], 100.0 / 3.0);
        assert_eq!(o.charts.line.red_label, "Expenses");
    }
}

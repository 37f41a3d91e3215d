//! Pure helpers for the dashboard series.

use crate::model::dates::month_key_of;
use chrono::{Datelike, Months, NaiveDate};

/// Percentage change from `prev` to `curr`. `None` when `prev` is zero.
pub fn pct_change(curr: f64, prev: f64) -> Option<f64> {
    if prev == 0.0 {
        return None;
    }
    Some((curr - prev) / prev * 100.0)
}

/// Trailing simple moving average. The window shrinks at the start of the series instead of
/// padding it.
pub fn moving_average(series: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..series.len())
        .map(|i| {
            let slice = &series[i.saturating_sub(window - 1)..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// The first day of the month before the month of `date`.
pub fn previous_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date) - Months::new(1)
}

/// `YYYY-MM` keys of the twelve calendar months ending with the month of `today`, oldest first.
pub fn last_12_month_keys(today: NaiveDate) -> Vec<String> {
    let start = first_of_month(today);
    (0..12u32)
        .rev()
        .map(|back| month_key_of(start - Months::new(back)))
        .collect()
}

/// English three-letter month name for a `YYYY-MM` key, such as `Dec`. Empty for a bad key.
pub fn month_label(key: &str) -> String {
    NaiveDate::parse_from_str(&format!("{key}-01"), "%Y-%m-%d")
        .map(|d| d.format("%b").to_string())
        .unwrap_or_default()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_pct_change() {
        assert_eq!(pct_change(100.0, 50.0), Some(100.0));
        assert_eq!(pct_change(25.0, 50.0), Some(-50.0));
        assert_eq!(pct_change(10.0, 0.0), None);
    }

    #[test]
    fn test_moving_average_window_shrinks() {
        let avg = moving_average(&[3.0, 6.0, 9.0, 0.0], 3);
        assert_eq!(avg, vec![3.0, 4.5, 6.0, 5.0]);
        assert!(moving_average(&[], 3).is_empty());
    }

    #[test]
    fn test_last_12_month_keys() {
        let keys = last_12_month_keys(date("2026-01-31"));
        assert_eq!(keys.len(), 12);
        assert_eq!(keys[0], "2025-02");
        assert_eq!(keys[10], "2025-12");
        assert_eq!(keys[11], "2026-01");
    }

    #[test]
    fn test_previous_month() {
        assert_eq!(previous_month(date("2026-03-31")), date("2026-02-01"));
        assert_eq!(previous_month(date("2026-01-15")), date("2025-12-01"));
    }

    #[test]
    fn test_month_label() {
        assert_eq!(month_label("2025-12"), "Dec");
        assert_eq!(month_label("2026-05"), "May");
        assert_eq!(month_label("nope"), "");
    }
}

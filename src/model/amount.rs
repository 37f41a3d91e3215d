//! Amount type for rupiah values as typed by users and as stored in the sheet.
//!
//! Input is assumed to use Indonesian formatting: `.` separates thousands and `,` separates
//! decimals, optionally prefixed with `Rp`. This is not configurable. Parsing never fails;
//! anything that cannot be read as a number becomes zero and it is up to the caller to reject
//! non-positive amounts.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

/// A rupiah amount.
///
/// ```
/// # use konstruktor::model::Amount;
/// let amount = Amount::parse("Rp 1.250.000,50");
/// assert_eq!(amount.to_string(), "Rp 1.250.000,50");
/// assert!(Amount::parse("abc").is_zero());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Parses user input such as `"Rp 1.250.000,50"`. Returns zero when the input is not a number.
    pub fn parse(input: &str) -> Self {
        let cleaned: String = input
            .trim()
            .to_lowercase()
            .replace("rp", "")
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '.')
            .map(|c| if c == ',' { '.' } else { c })
            .collect();
        Self(parse_decimal(&cleaned).unwrap_or_default())
    }

    /// Reads an amount from a JSON value. Numbers are taken as they are, strings go through
    /// `Amount::parse`, everything else (including a missing value) is zero.
    pub fn from_cell(cell: Option<&Value>) -> Self {
        match cell {
            Some(Value::Number(n)) => Self(parse_decimal(&n.to_string()).unwrap_or_default()),
            Some(Value::String(s)) => Self::parse(s),
            _ => Self::ZERO,
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    /// The value as it should be written into a sheet cell.
    pub(crate) fn to_cell(self) -> Value {
        let normalized = self.0.normalize();
        if normalized.scale() == 0 {
            if let Some(i) = normalized.to_i64() {
                return Value::from(i);
            }
        }
        Value::from(self.to_f64())
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

impl fmt::Display for Amount {
    /// Formats as `Rp 1.250.000,50` (or `-Rp ...`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0.is_sign_negative() && !self.is_zero() {
            "-"
        } else {
            ""
        };
        let us = format_num::format_num!(",.2f", self.0.abs().to_f64().unwrap_or_default());
        let id: String = us
            .chars()
            .map(|c| match c {
                ',' => '.',
                '.' => ',',
                other => other,
            })
            .collect();
        write!(f, "{sign}Rp {id}")
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Amount {
    /// Accepts a JSON number or a formatted string.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Amount::from_cell(Some(&value)))
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount(value)
    }
}

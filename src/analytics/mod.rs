//! Report aggregation over snapshot rows.
//!
//! Both reports are pure functions of the rows read for one request. Efforts
//! are summed as [`Decimal`] so many small values do not drift.

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

pub mod burndown;
pub mod burnup;

pub use burndown::{BurndownPoint, burndown};
pub use burnup::{BurnupPoint, burnup};

/// Stored effort as a decimal; non-finite values count as zero.
pub(crate) fn effort(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Every calendar day from `start` to `end`, both inclusive.
pub(crate) fn days_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

pub(crate) fn is_business_day(day: NaiveDate) -> bool {
    !matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

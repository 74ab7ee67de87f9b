//! Month-granular dates: always the first of a month.

use chrono::{Datelike, Months, NaiveDate};

use crate::error::OffplanError;
use crate::OffplanResult;

/// First day of the given calendar month.
pub fn month_start(year: i32, month: u32) -> OffplanResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        OffplanError::invalid("month", format!("{year}-{month} is not a calendar month"))
    })
}

/// Handover quarters resolve to the last month of the quarter (Q1 = March).
pub fn quarter_end(year: i32, quarter: u32) -> OffplanResult<NaiveDate> {
    if !(1..=4).contains(&quarter) {
        return Err(OffplanError::invalid(
            "handover_quarter",
            format!("Quarter must be 1-4, got {quarter}"),
        ));
    }
    month_start(year, quarter * 3)
}

/// Whole months from `from` to `to` (negative when `to` is earlier).
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    i64::from(to.year() - from.year()) * 12 + i64::from(to.month()) - i64::from(from.month())
}

pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

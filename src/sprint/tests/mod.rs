//! Unit tests for the sprint context.


use chrono::NaiveDate;

pub(super) fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, day).expect("valid January date")
}

//! Month-grid date arithmetic.
//!
//! The calendar grid is six Monday-first weeks. Every helper works on UTC
//! calendar dates.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};

/// Number of days rendered in the visible window.
pub const WINDOW_DAYS: i64 = 42;

/// Offset into a week-aligned window that is guaranteed to land in the month
/// the window represents.
const SELECTED_MONTH_PROBE_DAYS: i64 = 10;

/// Monday on or before `date`.
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month `delta` months away from the month containing `date`.
pub fn shift_month(date: NaiveDate, delta: i32) -> Option<NaiveDate> {
    let first = start_of_month(date);
    let months = Months::new(delta.unsigned_abs());
    if delta >= 0 {
        first.checked_add_months(months)
    } else {
        first.checked_sub_months(months)
    }
}

/// Start of the 42-day grid showing the month that contains `date`.
pub fn window_start_for(date: NaiveDate) -> NaiveDate {
    start_of_week(start_of_month(date))
}

/// Date a week-aligned window starting at `window_start` is meant to display.
pub fn selected_month_date(window_start: NaiveDate) -> NaiveDate {
    window_start + Duration::days(SELECTED_MONTH_PROBE_DAYS)
}

/// English "<Month> <Year>" label, e.g. "October 2026".
pub fn month_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

//! Date patterns each birthday window queries for
//!
//! Birthdates are matched on their `YYYY-MM-DD` text, so a day is selected
//! with `-MM-DD` and a whole month with `-MM-`.

use crate::domain::BirthdayWindow;
use chrono::{Datelike, Duration, NaiveDate, Weekday};

fn month_day(date: NaiveDate) -> String {
    date.format("-%m-%d").to_string()
}

/// First day of the month after `date`
pub fn first_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Monday to Sunday of the week after `date`
pub fn next_week(date: NaiveDate) -> Vec<NaiveDate> {
    let to_monday = 7 - i64::from(date.weekday().num_days_from_monday());
    let monday = date + Duration::days(to_monday);
    (0..7).map(|offset| monday + Duration::days(offset)).collect()
}

/// Patterns `window` queries on `today`, `None` when the window is not due
///
/// Tomorrow and in-three-days run daily. Next week runs on Fridays only. Next
/// month runs four days before the first of the next month.
pub fn patterns(window: BirthdayWindow, today: NaiveDate) -> Option<Vec<String>> {
    match window {
        BirthdayWindow::Tomorrow => Some(vec![month_day(today + Duration::days(1))]),
        BirthdayWindow::InThreeDays => Some(vec![month_day(today + Duration::days(3))]),
        BirthdayWindow::NextWeek => {
            if today.weekday() != Weekday::Fri {
                return None;
            }
            Some(next_week(today).into_iter().map(month_day).collect())
        }
        BirthdayWindow::NextMonth => {
            let first = first_of_next_month(today)?;
            if today != first - Duration::days(4) {
                return None;
            }
            Some(vec![format!("-{:02}-", first.month())])
        }
    }
}

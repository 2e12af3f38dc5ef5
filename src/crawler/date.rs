//! Resolution of a listing row's date cell into an absolute timestamp.
//!
//! The listing abbreviates dates depending on age: a time of day for posts
//! from today, `MM.DD` for this year and `YY.MM.DD` before that. The full
//! timestamp is usually available in the cell's `title` attribute.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

const FULL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Resolve a date cell to a timestamp, relative to `now` for abbreviated forms.
///
/// `full` is the cell's embedded `YYYY-MM-DD HH:MM:SS` timestamp, if any.
/// When it is missing or malformed the displayed text decides which single
/// form applies; malformed text under that form resolves to `None`.
#[must_use]
pub fn resolve(full: Option<&str>, displayed: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    if let Some(parsed) = full.and_then(parse_full) {
        return Some(parsed);
    }

    let text = displayed.trim();
    if text.contains(':') {
        parse_time_of_day(text, now.date())
    } else if text.contains('.') {
        parse_dotted(text, now.year())
    } else {
        None
    }
}

fn parse_full(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), FULL_TIMESTAMP_FORMAT).ok()
}

/// `HH:MM` on `today`.
fn parse_time_of_day(text: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    let (hour, minute) = text.split_once(':')?;
    if minute.contains(':') {
        return None;
    }
    today.and_hms_opt(parse_number(hour)?, parse_number(minute)?, 0)
}

/// `MM.DD` in `year`, or `YY.MM.DD` in the 2000s.
fn parse_dotted(text: &str, year: i32) -> Option<NaiveDateTime> {
    let parts: Vec<&str> = text.split('.').collect();
    let date = match parts.as_slice() {
        [month, day] => NaiveDate::from_ymd_opt(year, parse_number(month)?, parse_number(day)?),
        [yy, month, day] => {
            let year = i32::try_from(parse_number(yy)?).ok()?.checked_add(2000)?;
            NaiveDate::from_ymd_opt(year, parse_number(month)?, parse_number(day)?)
        }
        _ => None,
    }?;
    date.and_hms_opt(0, 0, 0)
}

fn parse_number(segment: &str) -> Option<u32> {
    segment.trim().parse().ok()
}

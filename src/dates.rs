//! Date-range helpers shared by the recall loop and the aggregates.
//!
//! All ranges are closed `[start, end]` pairs in UTC, spanning from
//! `00:00:00.000` to `23:59:59.999` of the covered days.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};

/// UTC bounds of a single calendar day.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let end = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_default()
        .and_utc();
    (start, end)
}

/// The calendar day exactly `7 * weeks_ago` days before `today`.
///
/// This is the recall checkpoint: a single day, not a rolling 7-day window.
pub fn lookback_day(today: NaiveDate, weeks_ago: u32) -> NaiveDate {
    today - Duration::days(7 * i64::from(weeks_ago))
}

/// UTC bounds of the Monday-to-Sunday week containing `today`.
pub fn week_bounds(today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let days_from_monday = match today.weekday() {
        Weekday::Mon => 0,
        Weekday::Tue => 1,
        Weekday::Wed => 2,
        Weekday::Thu => 3,
        Weekday::Fri => 4,
        Weekday::Sat => 5,
        Weekday::Sun => 6,
    };
    let monday = today - Duration::days(days_from_monday);
    let sunday = monday + Duration::days(6);
    (day_bounds(monday).0, day_bounds(sunday).1)
}

/// Format a duration as `HH:MM:SS`. Negative durations clamp to zero.
pub fn format_hms(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

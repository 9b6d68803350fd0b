//! ISO-week helpers. Weeks start on Monday per ISO-8601; campaigns and
//! weekly records report against the *previous* ISO week (metrics for a
//! week are submitted once the week has closed).

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};

/// ISO week number of the given instant.
pub fn iso_week_of(ts: DateTime<Utc>) -> u32 {
    ts.iso_week().week()
}

/// The ISO week before the given instant's week. During week 1 this wraps
/// to the last week of the previous ISO year.
pub fn previous_iso_week(now: DateTime<Utc>) -> u32 {
    (now - Duration::weeks(1)).iso_week().week()
}

/// Monday 00:00:00 UTC of the week `weeks_back` weeks before `now`'s week.
pub fn week_start(now: DateTime<Utc>, weeks_back: i64) -> DateTime<Utc> {
    let shifted = now - Duration::weeks(weeks_back);
    let days_from_monday = shifted.weekday().num_days_from_monday() as i64;
    let monday = shifted.date_naive() - Duration::days(days_from_monday);
    Utc.from_utc_datetime(&monday.and_time(NaiveTime::MIN))
}

/// Monday-start, Sunday-end bounds of the week `weeks_back` weeks before
/// `now`'s week. The end bound is exclusive (next Monday 00:00:00).
pub fn week_bounds(now: DateTime<Utc>, weeks_back: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = week_start(now, weeks_back);
    (start, start + Duration::days(7))
}

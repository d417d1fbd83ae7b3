//! Reporting window boundaries
//!
//! Boundaries are computed on the local calendar of the reference instant and
//! returned in UTC for querying the record store.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// Monday 00:00 (local) of the week containing `now`
pub fn week_start<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let today = now.date_naive();
    let monday = today - Duration::days(i64::from(now.weekday().num_days_from_monday()));
    local_midnight(&now.timezone(), monday)
}

/// The 1st of the month, 00:00 (local), containing `now`
pub fn month_start<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let today = now.date_naive();
    let first = today.with_day(1).unwrap_or(today);
    local_midnight(&now.timezone(), first)
}

/// Start of `date` in `tz`
///
/// When midnight falls in a DST gap the first valid instant of the day is used.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=2)
        .find_map(|hours| {
            tz.from_local_datetime(&(midnight + Duration::hours(hours)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

//! Day keys: timestamps truncated to local midnight.
//!
//! Completion records are keyed by the epoch milliseconds of midnight in the
//! caller's time zone. Walking back one day subtracts a fixed [`DAY_MS`];
//! across a DST transition two consecutive midnights are 23 or 25 hours
//! apart and do not line up with that step.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Offset, TimeZone};

/// Milliseconds in one (fixed-length) day.
pub const DAY_MS: i64 = 86_400_000;

/// Epoch milliseconds of a local midnight.
pub type DayKey = i64;

/// Truncate a timestamp to midnight of its calendar day in its own zone.
pub fn normalize_to_day<Tz: TimeZone>(ts: &DateTime<Tz>) -> DayKey {
    day_key_for_date(ts.date_naive(), &ts.timezone())
}

/// Day key of a calendar date in the given zone.
pub fn day_key_for_date<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DayKey {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight).earliest() {
        Some(dt) => dt.timestamp_millis(),
        None => {
            // midnight skipped by a clock jump
            let offset_secs = tz.offset_from_utc_datetime(&midnight).fix().local_minus_utc();
            midnight.and_utc().timestamp_millis() - i64::from(offset_secs) * 1000
        }
    }
}

/// The key one fixed day before `key`.
pub fn previous_day(key: DayKey) -> DayKey {
    key - DAY_MS
}

/// Sunday that starts the week containing `date`.
pub fn week_start_sunday(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

//! Reference-calendar helpers for attendance instants.
//!
//! Attendance dates are instants (epoch milliseconds). The daily cap groups
//! them by calendar day in a fixed reference offset, so every day window is
//! exactly `00:00:00.000..=23:59:59.999` local time.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

/// Inclusive instant range covering one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl DayWindow {
    pub fn contains(&self, instant_ms: i64) -> bool {
        (self.start_ms..=self.end_ms).contains(&instant_ms)
    }
}

/// Builds a reference offset from minutes east of UTC.
///
/// Returns `None` outside `-1439..=1439`.
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    if minutes.abs() >= 24 * 60 {
        return None;
    }
    FixedOffset::east_opt(minutes * 60)
}

/// Parses client date input into an instant.
///
/// Accepted forms:
/// - RFC 3339 with explicit offset (`2024-01-10T09:00:00Z`)
/// - naive date-time in the reference calendar (`2024-01-10T09:00`,
///   `2024-01-10T09:00:00`, `2024-01-10 09:00:00.250`)
/// - plain date, meaning local midnight (`2024-01-10`)
pub fn parse_instant(raw: &str, zone: FixedOffset) -> Option<i64> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.timestamp_millis());
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return local_to_millis(naive, zone);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| local_to_millis(date.and_time(NaiveTime::MIN), zone))
}

/// Returns the calendar-day window containing `instant_ms`.
pub fn day_window(instant_ms: i64, zone: FixedOffset) -> Option<DayWindow> {
    let day = local_date(instant_ms, zone)?;
    let start = day.and_hms_milli_opt(0, 0, 0, 0)?;
    let end = day.and_hms_milli_opt(23, 59, 59, 999)?;
    Some(DayWindow {
        start_ms: local_to_millis(start, zone)?,
        end_ms: local_to_millis(end, zone)?,
    })
}

/// Calendar date of an instant in the reference calendar.
pub fn local_date(instant_ms: i64, zone: FixedOffset) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(instant_ms).map(|utc| utc.with_timezone(&zone).date_naive())
}

/// Day-of-week index with Sunday = 0 through Saturday = 6.
pub fn weekday_index(date: NaiveDate) -> u8 {
    // num_days_from_sunday is always < 7
    date.weekday().num_days_from_sunday() as u8
}

fn local_to_millis(naive: NaiveDateTime, zone: FixedOffset) -> Option<i64> {
    zone.from_local_datetime(&naive)
        .single()
        .map(|instant| instant.timestamp_millis())
}

//! Weekly timetable entries.
//!
//! Times are kept as minutes after local midnight so ordering is numeric;
//! `9:00 AM` style labels exist only at the edges (seeding and display).

use crate::model::roster::Subject;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

pub type TimetableEntryId = Uuid;

static CLOCK_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(\d{1,2}):(\d{2})\s*(AM|PM)\s*$").expect("valid clock label regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableEntry {
    pub id: TimetableEntryId,
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: u8,
    pub start_minute: u16,
    pub end_minute: u16,
    pub start_time: String,
    pub end_time: String,
    pub subject: Subject,
    pub room: String,
}

/// Parses a 12-hour clock label (`9:00 AM`, `12:30 PM`) into minutes.
pub fn parse_clock_label(label: &str) -> Option<u16> {
    let caps = CLOCK_LABEL_RE.captures(label)?;
    let hour: u16 = caps[1].parse().ok()?;
    let minute: u16 = caps[2].parse().ok()?;
    if !(1..=12).contains(&hour) || minute > 59 {
        return None;
    }
    let pm = caps[3].eq_ignore_ascii_case("PM");
    let hour24 = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    Some(hour24 * 60 + minute)
}

/// Renders minutes after midnight as a 12-hour clock label.
pub fn format_clock_label(minutes: u16) -> String {
    let hour24 = (minutes / 60) % 24;
    let minute = minutes % 60;
    let suffix = if hour24 < 12 { "AM" } else { "PM" };
    let hour12 = match hour24 % 12 {
        0 => 12,
        h => h,
    };
    format!("{hour12}:{minute:02} {suffix}")
}

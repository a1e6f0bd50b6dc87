//! Timetable lookup service.

use crate::model::calendar::{local_date, weekday_index};
use crate::model::timetable::TimetableEntry;
use crate::repo::attendance_repo::{RepoError, RepoResult};
use crate::repo::timetable_repo::TimetableRepository;
use chrono::FixedOffset;

pub struct TimetableService<R: TimetableRepository> {
    repo: R,
    zone: FixedOffset,
}

impl<R: TimetableRepository> TimetableService<R> {
    pub fn new(repo: R, zone: FixedOffset) -> Self {
        Self { repo, zone }
    }

    /// Entries for a weekday (0 = Sunday), earliest first.
    pub fn entries_for_day(&self, day_of_week: u8) -> RepoResult<Vec<TimetableEntry>> {
        if day_of_week > 6 {
            return Ok(Vec::new());
        }
        self.repo.entries_for_day(day_of_week)
    }

    /// Schedule for the reference-calendar weekday containing `now_ms`.
    pub fn today(&self, now_ms: i64) -> RepoResult<Vec<TimetableEntry>> {
        let date = local_date(now_ms, self.zone)
            .ok_or_else(|| RepoError::InvalidData(format!("instant out of range: {now_ms}")))?;
        self.entries_for_day(weekday_index(date))
    }
}

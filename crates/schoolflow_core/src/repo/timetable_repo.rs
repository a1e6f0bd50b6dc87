//! Timetable repository.
//!
//! Entries for a weekday come back ordered `start_minute ASC, id ASC`.

use crate::model::roster::SubjectId;
use crate::model::timetable::{format_clock_label, TimetableEntry, TimetableEntryId};
use crate::repo::attendance_repo::{RepoError, RepoResult};
use crate::repo::roster_repo::parse_subject_row;
use crate::repo::{ensure_schema_current, parse_uuid_column};
use rusqlite::{params, Connection};

/// Write shape for one timetable slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTimetableEntry {
    pub id: TimetableEntryId,
    pub day_of_week: u8,
    pub start_minute: u16,
    pub end_minute: u16,
    pub subject_id: SubjectId,
    pub room: String,
}

pub trait TimetableRepository {
    fn create_entry(&self, entry: &NewTimetableEntry) -> RepoResult<()>;
    fn entries_for_day(&self, day_of_week: u8) -> RepoResult<Vec<TimetableEntry>>;
}

pub struct SqliteTimetableRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTimetableRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_current(conn)?;
        Ok(Self { conn })
    }
}

impl TimetableRepository for SqliteTimetableRepository<'_> {
    fn create_entry(&self, entry: &NewTimetableEntry) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO timetable (id, day_of_week, start_minute, end_minute, subject_id, room)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                entry.id.to_string(),
                entry.day_of_week,
                entry.start_minute,
                entry.end_minute,
                entry.subject_id.to_string(),
                entry.room.as_str(),
            ],
        )?;
        Ok(())
    }

    fn entries_for_day(&self, day_of_week: u8) -> RepoResult<Vec<TimetableEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                t.id AS entry_id,
                t.day_of_week,
                t.start_minute,
                t.end_minute,
                t.room,
                s.id,
                s.name,
                s.code
             FROM timetable t
             INNER JOIN subjects s ON s.id = t.subject_id
             WHERE t.day_of_week = ?1
             ORDER BY t.start_minute ASC, t.id ASC;",
        )?;
        let mut rows = stmt.query([day_of_week])?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("entry_id")?;
            let start_minute = minute_column(row.get("start_minute")?, "start_minute")?;
            let end_minute = minute_column(row.get("end_minute")?, "end_minute")?;
            entries.push(TimetableEntry {
                id: parse_uuid_column(&id_text, "timetable.id")?,
                day_of_week: row.get("day_of_week")?,
                start_minute,
                end_minute,
                start_time: format_clock_label(start_minute),
                end_time: format_clock_label(end_minute),
                subject: parse_subject_row(row)?,
                room: row.get("room")?,
            });
        }
        Ok(entries)
    }
}

fn minute_column(value: i64, column: &'static str) -> RepoResult<u16> {
    u16::try_from(value)
        .ok()
        .filter(|minutes| *minutes < 24 * 60)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid minute `{value}` in timetable.{column}")))
}

//! Attendance store contract and SQLite implementation.
//!
//! # Responsibility
//! - Expose count/find/create/update/delete over attendance rows.
//! - Resolve the student and subject a row points at, for display expansion.
//!
//! # Invariants
//! - Multi-row reads are ordered `date DESC, id ASC`, so equal dates never
//!   drift between pages.
//! - Each write touches exactly one row.
//! - The store applies no cap or duplicate policy of its own.

use crate::db::DbError;
use crate::model::attendance::{
    AttendanceDraft, AttendanceId, AttendanceRecord, AttendanceStatus,
};
use crate::model::calendar::DayWindow;
use crate::model::roster::{Student, StudentId, Subject, SubjectId};
use crate::repo::roster_repo::{load_student, load_subject};
use crate::repo::{ensure_schema_current, parse_uuid_column};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ATTENDANCE_SELECT_SQL: &str = "SELECT
    id,
    student_id,
    subject_id,
    date_ms,
    status
FROM attendance";

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence error shared by all repositories.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Target row does not exist.
    NotFound(Uuid),
    /// Connection schema is not at the version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted row cannot be decoded into a valid model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "row not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Row filter understood by every `AttendanceStore`.
///
/// Unset fields do not constrain the result. `date_range` is inclusive on
/// both ends; `date_exact` compares full instants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendanceFilter {
    pub id: Option<AttendanceId>,
    pub exclude_id: Option<AttendanceId>,
    pub student_id: Option<StudentId>,
    pub subject_id: Option<SubjectId>,
    pub date_range: Option<DayWindow>,
    pub date_exact: Option<i64>,
}

impl AttendanceFilter {
    pub fn by_id(id: AttendanceId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_student(student_id: StudentId) -> Self {
        Self {
            student_id: Some(student_id),
            ..Self::default()
        }
    }

    pub fn by_pair(student_id: StudentId, subject_id: SubjectId) -> Self {
        Self {
            student_id: Some(student_id),
            subject_id: Some(subject_id),
            ..Self::default()
        }
    }

    pub fn within(mut self, window: DayWindow) -> Self {
        self.date_range = Some(window);
        self
    }

    pub fn at(mut self, instant_ms: i64) -> Self {
        self.date_exact = Some(instant_ms);
        self
    }

    pub fn excluding(mut self, id: AttendanceId) -> Self {
        self.exclude_id = Some(id);
        self
    }

    /// Evaluates the filter against one record.
    ///
    /// SQL-backed stores push the same predicate into `WHERE`; in-memory
    /// stores call this directly.
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        self.id.map_or(true, |id| record.id == id)
            && self.exclude_id.map_or(true, |id| record.id != id)
            && self.student_id.map_or(true, |id| record.student_id == id)
            && self.subject_id.map_or(true, |id| record.subject_id == id)
            && self
                .date_range
                .map_or(true, |window| window.contains(record.date_ms))
            && self.date_exact.map_or(true, |ms| record.date_ms == ms)
    }

    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut sql = String::from(" WHERE 1 = 1");
        let mut bind_values = Vec::new();

        if let Some(id) = self.id {
            sql.push_str(" AND id = ?");
            bind_values.push(Value::Text(id.to_string()));
        }
        if let Some(id) = self.exclude_id {
            sql.push_str(" AND id <> ?");
            bind_values.push(Value::Text(id.to_string()));
        }
        if let Some(id) = self.student_id {
            sql.push_str(" AND student_id = ?");
            bind_values.push(Value::Text(id.to_string()));
        }
        if let Some(id) = self.subject_id {
            sql.push_str(" AND subject_id = ?");
            bind_values.push(Value::Text(id.to_string()));
        }
        if let Some(window) = self.date_range {
            sql.push_str(" AND date_ms >= ? AND date_ms <= ?");
            bind_values.push(Value::Integer(window.start_ms));
            bind_values.push(Value::Integer(window.end_ms));
        }
        if let Some(ms) = self.date_exact {
            sql.push_str(" AND date_ms = ?");
            bind_values.push(Value::Integer(ms));
        }

        (sql, bind_values)
    }
}

/// Storage contract consumed by the attendance invariant engine and queries.
pub trait AttendanceStore {
    fn count(&self, filter: &AttendanceFilter) -> RepoResult<u64>;
    /// Returns matching rows ordered `date DESC, id ASC`, skipping `skip` and
    /// returning at most `take` rows (`None` = no upper bound).
    fn find_many(
        &self,
        filter: &AttendanceFilter,
        skip: u64,
        take: Option<u32>,
    ) -> RepoResult<Vec<AttendanceRecord>>;
    fn find_first(&self, filter: &AttendanceFilter) -> RepoResult<Option<AttendanceRecord>>;
    fn create(&self, draft: &AttendanceDraft) -> RepoResult<AttendanceRecord>;
    /// Overwrites every field of an existing row; `NotFound` when absent.
    fn update(&self, id: AttendanceId, draft: &AttendanceDraft) -> RepoResult<AttendanceRecord>;
    /// Deletes one row; `NotFound` when absent.
    fn delete(&self, id: AttendanceId) -> RepoResult<()>;
    fn student(&self, id: StudentId) -> RepoResult<Option<Student>>;
    fn subject(&self, id: SubjectId) -> RepoResult<Option<Subject>>;
}

impl<S: AttendanceStore + ?Sized> AttendanceStore for &S {
    fn count(&self, filter: &AttendanceFilter) -> RepoResult<u64> {
        (**self).count(filter)
    }

    fn find_many(
        &self,
        filter: &AttendanceFilter,
        skip: u64,
        take: Option<u32>,
    ) -> RepoResult<Vec<AttendanceRecord>> {
        (**self).find_many(filter, skip, take)
    }

    fn find_first(&self, filter: &AttendanceFilter) -> RepoResult<Option<AttendanceRecord>> {
        (**self).find_first(filter)
    }

    fn create(&self, draft: &AttendanceDraft) -> RepoResult<AttendanceRecord> {
        (**self).create(draft)
    }

    fn update(&self, id: AttendanceId, draft: &AttendanceDraft) -> RepoResult<AttendanceRecord> {
        (**self).update(id, draft)
    }

    fn delete(&self, id: AttendanceId) -> RepoResult<()> {
        (**self).delete(id)
    }

    fn student(&self, id: StudentId) -> RepoResult<Option<Student>> {
        (**self).student(id)
    }

    fn subject(&self, id: SubjectId) -> RepoResult<Option<Subject>> {
        (**self).subject(id)
    }
}

/// SQLite-backed attendance store.
pub struct SqliteAttendanceStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAttendanceStore<'conn> {
    /// Wraps a connection returned by `db::open_db*`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_current(conn)?;
        Ok(Self { conn })
    }
}

impl AttendanceStore for SqliteAttendanceStore<'_> {
    fn count(&self, filter: &AttendanceFilter) -> RepoResult<u64> {
        let (where_sql, bind_values) = filter.where_clause();
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM attendance{where_sql};"),
            params_from_iter(bind_values),
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn find_many(
        &self,
        filter: &AttendanceFilter,
        skip: u64,
        take: Option<u32>,
    ) -> RepoResult<Vec<AttendanceRecord>> {
        let (where_sql, mut bind_values) = filter.where_clause();
        let mut sql = format!("{ATTENDANCE_SELECT_SQL}{where_sql} ORDER BY date_ms DESC, id ASC");

        let offset = i64::try_from(skip).unwrap_or(i64::MAX);
        match take {
            Some(limit) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                bind_values.push(Value::Integer(i64::from(limit)));
                bind_values.push(Value::Integer(offset));
            }
            None if skip > 0 => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                bind_values.push(Value::Integer(offset));
            }
            None => {}
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_attendance_row(row)?);
        }
        Ok(records)
    }

    fn find_first(&self, filter: &AttendanceFilter) -> RepoResult<Option<AttendanceRecord>> {
        Ok(self.find_many(filter, 0, Some(1))?.into_iter().next())
    }

    fn create(&self, draft: &AttendanceDraft) -> RepoResult<AttendanceRecord> {
        let record = AttendanceRecord {
            id: Uuid::new_v4(),
            student_id: draft.student_id,
            subject_id: draft.subject_id,
            date_ms: draft.date_ms,
            status: draft.status,
        };

        self.conn.execute(
            "INSERT INTO attendance (id, student_id, subject_id, date_ms, status)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                record.id.to_string(),
                record.student_id.to_string(),
                record.subject_id.to_string(),
                record.date_ms,
                record.status.as_str(),
            ],
        )?;

        Ok(record)
    }

    fn update(&self, id: AttendanceId, draft: &AttendanceDraft) -> RepoResult<AttendanceRecord> {
        let changed = self.conn.execute(
            "UPDATE attendance
             SET
                student_id = ?1,
                subject_id = ?2,
                date_ms = ?3,
                status = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?5;",
            params![
                draft.student_id.to_string(),
                draft.subject_id.to_string(),
                draft.date_ms,
                draft.status.as_str(),
                id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(AttendanceRecord {
            id,
            student_id: draft.student_id,
            subject_id: draft.subject_id,
            date_ms: draft.date_ms,
            status: draft.status,
        })
    }

    fn delete(&self, id: AttendanceId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM attendance WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn student(&self, id: StudentId) -> RepoResult<Option<Student>> {
        load_student(self.conn, id)
    }

    fn subject(&self, id: SubjectId) -> RepoResult<Option<Subject>> {
        load_subject(self.conn, id)
    }
}

fn parse_attendance_row(row: &Row<'_>) -> RepoResult<AttendanceRecord> {
    let id_text: String = row.get("id")?;
    let student_text: String = row.get("student_id")?;
    let subject_text: String = row.get("subject_id")?;
    let status_text: String = row.get("status")?;

    let status = AttendanceStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in attendance.status"
        ))
    })?;

    Ok(AttendanceRecord {
        id: parse_uuid_column(&id_text, "attendance.id")?,
        student_id: parse_uuid_column(&student_text, "attendance.student_id")?,
        subject_id: parse_uuid_column(&subject_text, "attendance.subject_id")?,
        date_ms: row.get("date_ms")?,
        status,
    })
}

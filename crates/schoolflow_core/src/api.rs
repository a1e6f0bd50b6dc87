//! Boundary API consumed by the HTTP layer.
//!
//! # Responsibility
//! - Expose one method per external endpoint, with the role gate applied.
//! - Map service errors to status-coded `ApiError` values.
//! - Emit one `event=<endpoint>` log line per call with status and duration.
//!
//! # Invariants
//! - Admin endpoints require `ADMIN`; `my_*` endpoints require `STUDENT`.
//! - Store failures surface as 500 with a generic message; the detail goes
//!   to the log only.
//! - Nothing here holds state between calls.

use crate::access::{require_role, Forbidden, Principal};
use crate::model::attendance::{AttendanceDetail, AttendanceRecord};
use crate::model::roster::{Role, Student, StudentWithUser, Subject};
use crate::model::timetable::TimetableEntry;
use crate::repo::attendance_repo::{RepoError, SqliteAttendanceStore};
use crate::repo::roster_repo::SqliteRosterRepository;
use crate::repo::timetable_repo::SqliteTimetableRepository;
use crate::service::attendance_guard::{AttendanceError, AttendancePatch, CreateAttendanceInput};
use crate::service::attendance_service::AttendanceService;
use crate::service::pagination::{Page, PageRequest};
use crate::service::roster_service::{
    CreatedStudent, NewStudentInput, RosterService, RosterServiceError, StudentPatch,
};
use crate::service::timetable_service::TimetableService;
use chrono::FixedOffset;
use log::{error, info, warn};
use rusqlite::Connection;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

const SERVER_ERROR_MESSAGE: &str = "Server error";

/// Error returned to the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// HTTP-equivalent status code.
    #[serde(skip)]
    pub status: u16,
    /// Stable snake_case error code.
    pub code: &'static str,
    #[serde(rename = "error")]
    pub message: String,
}

impl ApiError {
    fn new(status: u16, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn server_error() -> Self {
        Self::new(500, "store_failure", SERVER_ERROR_MESSAGE)
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.status, self.code, self.message)
    }
}

impl Error for ApiError {}

impl From<Forbidden> for ApiError {
    fn from(value: Forbidden) -> Self {
        Self::new(403, "forbidden", value.to_string())
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        error!("event=store_failure module=api status=error error={value}");
        Self::server_error()
    }
}

impl From<AttendanceError> for ApiError {
    fn from(value: AttendanceError) -> Self {
        match &value {
            AttendanceError::MissingField(_) => Self::new(400, "missing_field", value.to_string()),
            AttendanceError::InvalidField { .. } => {
                Self::new(400, "invalid_field", value.to_string())
            }
            AttendanceError::NotFound(_) => Self::new(404, "not_found", "Record not found"),
            AttendanceError::LimitExceeded { .. } => {
                Self::new(400, "limit_exceeded", value.to_string())
            }
            AttendanceError::DuplicateRecord { .. } => {
                Self::new(400, "duplicate_record", value.to_string())
            }
            AttendanceError::Store(err) => {
                error!("event=store_failure module=api status=error error={err}");
                Self::server_error()
            }
        }
    }
}

impl From<RosterServiceError> for ApiError {
    fn from(value: RosterServiceError) -> Self {
        match &value {
            RosterServiceError::MissingField(_) => {
                Self::new(400, "missing_field", value.to_string())
            }
            RosterServiceError::StudentNotFound(_) => {
                Self::new(404, "not_found", "Student not found")
            }
            RosterServiceError::ProfileNotFound(_) => {
                Self::new(404, "not_found", "Student profile not found")
            }
            RosterServiceError::EmailInUse(_) => Self::new(400, "email_in_use", value.to_string()),
            RosterServiceError::RollNumberInUse(_) => {
                Self::new(400, "roll_number_in_use", value.to_string())
            }
            RosterServiceError::Repo(err) => {
                error!("event=store_failure module=api status=error error={err}");
                Self::server_error()
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Response of the student self-service attendance endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MyAttendance {
    pub student: Student,
    pub records: Vec<AttendanceDetail>,
}

/// Endpoint facade over one open connection.
pub struct SchoolApi<'conn> {
    conn: &'conn Connection,
    zone: FixedOffset,
}

impl<'conn> SchoolApi<'conn> {
    /// `zone` is the reference calendar for attendance days and "today".
    pub fn new(conn: &'conn Connection, zone: FixedOffset) -> Self {
        Self { conn, zone }
    }

    /// `POST attendance`: records one entry (admin).
    pub fn attendance_create(
        &self,
        principal: &Principal,
        input: &CreateAttendanceInput,
    ) -> ApiResult<AttendanceRecord> {
        self.call("attendance_create", principal, Role::Admin, || {
            Ok(self.attendance()?.create(input)?)
        })
    }

    /// `PUT attendance/:id`: partial update (admin).
    pub fn attendance_update(
        &self,
        principal: &Principal,
        record_id: &str,
        patch: &AttendancePatch,
    ) -> ApiResult<AttendanceDetail> {
        self.call("attendance_update", principal, Role::Admin, || {
            Ok(self.attendance()?.update(record_id, patch)?)
        })
    }

    /// `GET attendance?page&limit`: global listing (admin).
    pub fn attendance_list_all(
        &self,
        principal: &Principal,
        request: PageRequest,
    ) -> ApiResult<Page<AttendanceDetail>> {
        self.call("attendance_list_all", principal, Role::Admin, || {
            Ok(self.attendance()?.list_all(request)?)
        })
    }

    /// `GET attendance/:studentId` (admin).
    ///
    /// A malformed id matches no student and yields an empty list.
    pub fn attendance_list_by_student(
        &self,
        principal: &Principal,
        student_id: &str,
    ) -> ApiResult<Vec<AttendanceDetail>> {
        self.call("attendance_list_by_student", principal, Role::Admin, || {
            let Ok(student_id) = Uuid::parse_str(student_id.trim()) else {
                return Ok(Vec::new());
            };
            Ok(self.attendance()?.list_by_student(student_id)?)
        })
    }

    /// `DELETE attendance/:id` (admin).
    pub fn attendance_delete(&self, principal: &Principal, record_id: &str) -> ApiResult<()> {
        self.call("attendance_delete", principal, Role::Admin, || {
            Ok(self.attendance()?.delete(record_id)?)
        })
    }

    /// `POST students` (admin).
    pub fn students_create(
        &self,
        principal: &Principal,
        input: &NewStudentInput,
    ) -> ApiResult<CreatedStudent> {
        self.call("students_create", principal, Role::Admin, || {
            Ok(self.roster()?.create_student(input)?)
        })
    }

    /// `PUT students/:id` (admin).
    pub fn students_update(
        &self,
        principal: &Principal,
        student_id: &str,
        patch: &StudentPatch,
    ) -> ApiResult<Student> {
        self.call("students_update", principal, Role::Admin, || {
            Ok(self.roster()?.update_student(student_id, patch)?)
        })
    }

    /// `DELETE students/:id` (admin); cascades to attendance and account.
    pub fn students_delete(&self, principal: &Principal, student_id: &str) -> ApiResult<()> {
        self.call("students_delete", principal, Role::Admin, || {
            Ok(self.roster()?.delete_student(student_id)?)
        })
    }

    /// `GET students?page&limit` (admin).
    pub fn students_list(
        &self,
        principal: &Principal,
        request: PageRequest,
    ) -> ApiResult<Page<StudentWithUser>> {
        self.call("students_list", principal, Role::Admin, || {
            Ok(self.roster()?.list_students(request)?)
        })
    }

    /// `GET subjects` (admin).
    pub fn subjects_list(&self, principal: &Principal) -> ApiResult<Vec<Subject>> {
        self.call("subjects_list", principal, Role::Admin, || {
            Ok(self.roster()?.list_subjects()?)
        })
    }

    /// `GET student/attendance`: the caller's own records (student).
    pub fn my_attendance(&self, principal: &Principal) -> ApiResult<MyAttendance> {
        self.call("my_attendance", principal, Role::Student, || {
            let student = self.own_student(principal)?;
            let records = self.attendance()?.list_by_student(student.id)?;
            Ok(MyAttendance { student, records })
        })
    }

    /// `GET student/timetable`: today's schedule (student).
    pub fn my_timetable_today(
        &self,
        principal: &Principal,
        now_ms: i64,
    ) -> ApiResult<Vec<TimetableEntry>> {
        self.call("my_timetable_today", principal, Role::Student, || {
            let repo = SqliteTimetableRepository::try_new(self.conn)?;
            Ok(TimetableService::new(repo, self.zone).today(now_ms)?)
        })
    }

    fn attendance(&self) -> Result<AttendanceService<SqliteAttendanceStore<'conn>>, ApiError> {
        let store = SqliteAttendanceStore::try_new(self.conn)?;
        Ok(AttendanceService::new(store, self.zone))
    }

    fn roster(&self) -> Result<RosterService<SqliteRosterRepository<'conn>>, ApiError> {
        Ok(RosterService::new(SqliteRosterRepository::try_new(self.conn)?))
    }

    fn own_student(&self, principal: &Principal) -> ApiResult<Student> {
        let Ok(user_id) = Uuid::parse_str(principal.user_id.trim()) else {
            return Err(ApiError::new(404, "not_found", "Student profile not found"));
        };
        Ok(self.roster()?.student_for_user(user_id)?)
    }

    fn call<T>(
        &self,
        event: &'static str,
        principal: &Principal,
        required: Role,
        handler: impl FnOnce() -> ApiResult<T>,
    ) -> ApiResult<T> {
        let started_at = Instant::now();
        let result = require_role(principal, required)
            .map_err(ApiError::from)
            .and_then(|()| handler());

        let duration_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(_) => info!(
                "event={event} module=api status=ok role={} duration_ms={duration_ms}",
                principal.role.as_str()
            ),
            Err(err) if err.status >= 500 => error!(
                "event={event} module=api status=error role={} duration_ms={duration_ms} error_code={}",
                principal.role.as_str(),
                err.code
            ),
            Err(err) => warn!(
                "event={event} module=api status=rejected role={} duration_ms={duration_ms} error_code={}",
                principal.role.as_str(),
                err.code
            ),
        }
        result
    }
}

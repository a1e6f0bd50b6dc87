//! Core domain logic for the SchoolFlow attendance backend.
//! This crate is the single source of truth for attendance invariants.

pub mod access;
pub mod api;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod seed;
pub mod service;

pub use access::{require_role, Forbidden, Principal};
pub use api::{ApiError, ApiResult, MyAttendance, SchoolApi};
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::attendance::{
    AttendanceDetail, AttendanceDraft, AttendanceId, AttendanceRecord, AttendanceStatus,
    DAILY_RECORD_CAP,
};
pub use model::calendar::{day_window, parse_instant, DayWindow};
pub use model::roster::{
    Role, Student, StudentId, StudentWithUser, Subject, SubjectId, UserAccount, UserId,
};
pub use model::timetable::TimetableEntry;
pub use repo::attendance_repo::{
    AttendanceFilter, AttendanceStore, RepoError, RepoResult, SqliteAttendanceStore,
};
pub use repo::roster_repo::{RosterRepository, SqliteRosterRepository};
pub use repo::timetable_repo::{SqliteTimetableRepository, TimetableRepository};
pub use seed::{database_summary, seed_demo_data, DatabaseSummary};
pub use service::attendance_guard::{
    merge_changes, AttendanceChanges, AttendanceError, AttendanceGuard, AttendancePatch,
    CreateAttendanceInput,
};
pub use service::attendance_service::AttendanceService;
pub use service::pagination::{total_pages, Page, PageRequest, DEFAULT_PAGE_LIMIT};
pub use service::roster_service::{
    CreatedStudent, NewStudentInput, RosterService, RosterServiceError, StudentPatch,
};
pub use service::timetable_service::TimetableService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

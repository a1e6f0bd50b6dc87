//! Attendance invariant engine.
//!
//! # Responsibility
//! - Decide whether an attendance create or update may be written.
//! - Turn raw client input into typed drafts.
//!
//! # Invariants
//! - At most `DAILY_RECORD_CAP` rows per (student, subject, calendar day).
//! - After an update no other row shares the exact (student, subject,
//!   instant) triple of the updated row.
//! - Update checks run NotFound, then the cap, then the duplicate check, and
//!   stop at the first failure.
//! - The guard only reads; a rejection leaves the store untouched.
//!
//! Decisions are recomputed from the store on every call. Two writers racing
//! on the same (student, subject, day) can both pass the cap before either
//! commits; attendance entry is human-paced, so the race is accepted rather
//! than serialized.

use crate::model::attendance::{
    AttendanceDraft, AttendanceId, AttendanceRecord, AttendanceStatus, DAILY_RECORD_CAP,
};
use crate::model::calendar::{day_window, parse_instant};
use crate::model::roster::{StudentId, SubjectId};
use crate::repo::attendance_repo::{AttendanceFilter, AttendanceStore, RepoError};
use chrono::FixedOffset;
use log::{debug, warn};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Errors surfaced by attendance checks and queries.
#[derive(Debug)]
pub enum AttendanceError {
    /// Required input is absent or blank.
    MissingField(&'static str),
    /// Input is present but cannot be interpreted.
    InvalidField { field: &'static str, value: String },
    /// Referenced attendance row does not exist.
    NotFound(String),
    /// The (student, subject, day) already holds the maximum number of rows.
    LimitExceeded {
        student_id: StudentId,
        subject_id: SubjectId,
        existing: u64,
    },
    /// Another row already has the exact (student, subject, instant).
    DuplicateRecord { conflicting_id: AttendanceId },
    /// Persistence-layer failure.
    Store(RepoError),
}

impl Display for AttendanceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::InvalidField { field, value } => {
                write!(f, "invalid value `{value}` for field `{field}`")
            }
            Self::NotFound(id) => write!(f, "attendance record not found: {id}"),
            Self::LimitExceeded { .. } => write!(
                f,
                "maximum {DAILY_RECORD_CAP} attendance records allowed per subject per day"
            ),
            Self::DuplicateRecord { .. } => write!(
                f,
                "an attendance record already exists for this student, subject, and date"
            ),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AttendanceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AttendanceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id.to_string()),
            other => Self::Store(other),
        }
    }
}

pub type AttendanceResult<T> = Result<T, AttendanceError>;

/// Raw create request as received from the boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttendanceInput {
    pub student_id: Option<String>,
    pub subject_id: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
}

/// Raw partial update; absent or blank fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePatch {
    pub student_id: Option<String>,
    pub subject_id: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
}

/// Typed form of `AttendancePatch`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendanceChanges {
    pub student_id: Option<StudentId>,
    pub subject_id: Option<SubjectId>,
    pub date_ms: Option<i64>,
    pub status: Option<AttendanceStatus>,
}

/// Update approved by the guard, ready to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovedUpdate {
    pub id: AttendanceId,
    pub effective: AttendanceDraft,
}

/// Merges a patch over the existing record.
///
/// Pure: the existing record is not modified.
pub fn merge_changes(existing: &AttendanceRecord, changes: &AttendanceChanges) -> AttendanceDraft {
    AttendanceDraft {
        student_id: changes.student_id.unwrap_or(existing.student_id),
        subject_id: changes.subject_id.unwrap_or(existing.subject_id),
        date_ms: changes.date_ms.unwrap_or(existing.date_ms),
        status: changes.status.unwrap_or(existing.status),
    }
}

/// Validates attendance writes against the store.
pub struct AttendanceGuard<'s, S: AttendanceStore> {
    store: &'s S,
    zone: FixedOffset,
}

impl<'s, S: AttendanceStore> AttendanceGuard<'s, S> {
    pub fn new(store: &'s S, zone: FixedOffset) -> Self {
        Self { store, zone }
    }

    /// Validates a create request and returns the draft to persist.
    ///
    /// # Errors
    /// - `MissingField` / `InvalidField` for unusable input.
    /// - `LimitExceeded` when the day already holds the cap.
    pub fn check_create(&self, input: &CreateAttendanceInput) -> AttendanceResult<AttendanceDraft> {
        let student_raw = required(&input.student_id, "studentId")?;
        let subject_raw = required(&input.subject_id, "subjectId")?;
        let date_raw = required(&input.date, "date")?;
        let status_raw = required(&input.status, "status")?;

        let draft = AttendanceDraft {
            student_id: parse_id(student_raw, "studentId")?,
            subject_id: parse_id(subject_raw, "subjectId")?,
            date_ms: self.parse_date(date_raw)?,
            status: parse_status(status_raw)?,
        };

        self.ensure_below_cap(&draft, None)?;
        Ok(draft)
    }

    /// Validates a partial update of `record_id`.
    ///
    /// # Errors
    /// - `NotFound` when the record does not exist.
    /// - `InvalidField` for unusable patch values.
    /// - `LimitExceeded`, then `DuplicateRecord`, for policy violations.
    pub fn check_update(
        &self,
        record_id: &str,
        patch: &AttendancePatch,
    ) -> AttendanceResult<ApprovedUpdate> {
        let existing = self.existing_record(record_id)?;
        let changes = self.parse_patch(patch)?;
        let effective = merge_changes(&existing, &changes);

        self.ensure_below_cap(&effective, Some(existing.id))?;
        self.ensure_no_exact_duplicate(&effective, existing.id)?;

        Ok(ApprovedUpdate {
            id: existing.id,
            effective,
        })
    }

    /// Resolves a raw record id, mapping malformed ids to `NotFound`.
    pub fn existing_record(&self, record_id: &str) -> AttendanceResult<AttendanceRecord> {
        let not_found = || AttendanceError::NotFound(record_id.trim().to_string());
        let id = Uuid::parse_str(record_id.trim()).map_err(|_| not_found())?;
        self.store
            .find_first(&AttendanceFilter::by_id(id))?
            .ok_or_else(not_found)
    }

    pub fn parse_patch(&self, patch: &AttendancePatch) -> AttendanceResult<AttendanceChanges> {
        Ok(AttendanceChanges {
            student_id: optional(&patch.student_id)
                .map(|raw| parse_id(raw, "studentId"))
                .transpose()?,
            subject_id: optional(&patch.subject_id)
                .map(|raw| parse_id(raw, "subjectId"))
                .transpose()?,
            date_ms: optional(&patch.date)
                .map(|raw| self.parse_date(raw))
                .transpose()?,
            status: optional(&patch.status).map(parse_status).transpose()?,
        })
    }

    fn ensure_below_cap(
        &self,
        draft: &AttendanceDraft,
        exclude: Option<AttendanceId>,
    ) -> AttendanceResult<()> {
        let window = day_window(draft.date_ms, self.zone).ok_or_else(|| {
            AttendanceError::InvalidField {
                field: "date",
                value: draft.date_ms.to_string(),
            }
        })?;

        let mut filter = AttendanceFilter::by_pair(draft.student_id, draft.subject_id).within(window);
        if let Some(id) = exclude {
            filter = filter.excluding(id);
        }

        let existing = self.store.count(&filter)?;
        debug!(
            "event=attendance_cap_check module=attendance student_id={} subject_id={} day_start_ms={} existing={existing}",
            draft.student_id, draft.subject_id, window.start_ms
        );
        if existing >= DAILY_RECORD_CAP {
            warn!(
                "event=attendance_rejected module=attendance reason=limit_exceeded student_id={} subject_id={} day_start_ms={} existing={existing}",
                draft.student_id, draft.subject_id, window.start_ms
            );
            return Err(AttendanceError::LimitExceeded {
                student_id: draft.student_id,
                subject_id: draft.subject_id,
                existing,
            });
        }
        Ok(())
    }

    fn ensure_no_exact_duplicate(
        &self,
        draft: &AttendanceDraft,
        updating: AttendanceId,
    ) -> AttendanceResult<()> {
        let filter = AttendanceFilter::by_pair(draft.student_id, draft.subject_id)
            .at(draft.date_ms)
            .excluding(updating);
        if let Some(conflict) = self.store.find_first(&filter)? {
            warn!(
                "event=attendance_rejected module=attendance reason=duplicate_record record_id={updating} conflicting_id={}",
                conflict.id
            );
            return Err(AttendanceError::DuplicateRecord {
                conflicting_id: conflict.id,
            });
        }
        Ok(())
    }

    fn parse_date(&self, raw: &str) -> AttendanceResult<i64> {
        parse_instant(raw, self.zone).ok_or_else(|| AttendanceError::InvalidField {
            field: "date",
            value: raw.to_string(),
        })
    }
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> AttendanceResult<&'a str> {
    optional(value).ok_or(AttendanceError::MissingField(field))
}

fn optional(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

fn parse_id(raw: &str, field: &'static str) -> AttendanceResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AttendanceError::InvalidField {
        field,
        value: raw.to_string(),
    })
}

fn parse_status(raw: &str) -> AttendanceResult<AttendanceStatus> {
    AttendanceStatus::parse(raw).ok_or_else(|| AttendanceError::InvalidField {
        field: "status",
        value: raw.to_string(),
    })
}

//! Attendance domain model.
//!
//! # Invariants
//! - A record references exactly one student and one subject.
//! - `date_ms` keeps the full instant supplied by the writer.
//! - At most `DAILY_RECORD_CAP` records share one (student, subject, day).

use crate::model::roster::{Student, StudentId, Subject, SubjectId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AttendanceId = Uuid;

/// Maximum attendance rows per (student, subject, calendar day).
pub const DAILY_RECORD_CAP: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "PRESENT",
            Self::Absent => "ABSENT",
        }
    }

    /// Parses an upper-case status tag, ignoring surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "PRESENT" => Some(Self::Present),
            "ABSENT" => Some(Self::Absent),
            _ => None,
        }
    }
}

/// Persisted attendance row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    /// Epoch milliseconds.
    #[serde(rename = "date")]
    pub date_ms: i64,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    pub fn draft(&self) -> AttendanceDraft {
        AttendanceDraft {
            student_id: self.student_id,
            subject_id: self.subject_id,
            date_ms: self.date_ms,
            status: self.status,
        }
    }
}

/// Field values for a create or an in-place update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceDraft {
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    pub date_ms: i64,
    pub status: AttendanceStatus,
}

/// Attendance row expanded for display.
///
/// `student` is omitted by per-student listings, where it would repeat the
/// same value on every row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDetail {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<Student>,
    pub subject: Subject,
}

#[cfg(test)]
mod tests {
    use super::{AttendanceRecord, AttendanceStatus};
    use uuid::Uuid;

    #[test]
    fn status_parse_accepts_only_upper_case_tags() {
        assert_eq!(AttendanceStatus::parse(" PRESENT "), Some(AttendanceStatus::Present));
        assert_eq!(AttendanceStatus::parse("ABSENT"), Some(AttendanceStatus::Absent));
        assert_eq!(AttendanceStatus::parse("present"), None);
        assert_eq!(AttendanceStatus::parse("LATE"), None);
    }

    #[test]
    fn record_serializes_with_external_field_names() {
        let record = AttendanceRecord {
            id: Uuid::nil(),
            student_id: Uuid::nil(),
            subject_id: Uuid::nil(),
            date_ms: 1_704_877_200_000,
            status: AttendanceStatus::Absent,
        };
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["date"], 1_704_877_200_000_i64);
        assert_eq!(json["status"], "ABSENT");
        assert!(json.get("studentId").is_some());
        assert!(json.get("date_ms").is_none());
    }
}

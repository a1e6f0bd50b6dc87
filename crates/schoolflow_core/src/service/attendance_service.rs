//! Attendance use-case service.
//!
//! # Responsibility
//! - Run every write through `AttendanceGuard` before touching the store.
//! - Serve the deterministic attendance listings.
//!
//! # Invariants
//! - Listings are ordered `date DESC, id ASC`.
//! - `list_all` totals count the whole table, independent of the page.
//! - Errors are returned typed and never swallowed.

use crate::model::attendance::{AttendanceDetail, AttendanceRecord};
use crate::model::roster::{Student, StudentId, Subject, SubjectId};
use crate::repo::attendance_repo::{AttendanceFilter, AttendanceStore, RepoError};
use crate::service::attendance_guard::{
    AttendanceError, AttendanceGuard, AttendancePatch, AttendanceResult, CreateAttendanceInput,
};
use crate::service::pagination::{Page, PageRequest};
use chrono::FixedOffset;
use log::info;
use std::collections::HashMap;

/// Attendance service over an injected store.
pub struct AttendanceService<S: AttendanceStore> {
    store: S,
    zone: FixedOffset,
}

impl<S: AttendanceStore> AttendanceService<S> {
    /// Creates a service whose calendar days are computed in `zone`.
    pub fn new(store: S, zone: FixedOffset) -> Self {
        Self { store, zone }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn guard(&self) -> AttendanceGuard<'_, S> {
        AttendanceGuard::new(&self.store, self.zone)
    }

    /// Records one attendance entry after the daily-cap check.
    pub fn create(&self, input: &CreateAttendanceInput) -> AttendanceResult<AttendanceRecord> {
        let draft = self.guard().check_create(input)?;
        let record = self.store.create(&draft)?;
        info!(
            "event=attendance_created module=attendance record_id={} student_id={} subject_id={} date_ms={}",
            record.id, record.student_id, record.subject_id, record.date_ms
        );
        Ok(record)
    }

    /// Applies a partial update after cap and duplicate checks.
    ///
    /// Returns the updated row with student and subject expanded.
    pub fn update(
        &self,
        record_id: &str,
        patch: &AttendancePatch,
    ) -> AttendanceResult<AttendanceDetail> {
        let approved = self.guard().check_update(record_id, patch)?;
        let record = self.store.update(approved.id, &approved.effective)?;
        info!(
            "event=attendance_updated module=attendance record_id={} status={}",
            record.id,
            record.status.as_str()
        );

        let student = self.require_student(record.student_id)?;
        let subject = self.require_subject(record.subject_id)?;
        Ok(AttendanceDetail {
            record,
            student: Some(student),
            subject,
        })
    }

    /// Deletes one record; malformed or unknown ids yield `NotFound`.
    pub fn delete(&self, record_id: &str) -> AttendanceResult<()> {
        let existing = self.guard().existing_record(record_id)?;
        self.store.delete(existing.id)?;
        info!(
            "event=attendance_deleted module=attendance record_id={}",
            existing.id
        );
        Ok(())
    }

    /// Every record of one student, newest first, with subject expanded.
    pub fn list_by_student(&self, student_id: StudentId) -> AttendanceResult<Vec<AttendanceDetail>> {
        let records = self
            .store
            .find_many(&AttendanceFilter::by_student(student_id), 0, None)?;
        self.expand(records, false)
    }

    /// One page of all records, newest first, with student and subject.
    pub fn list_all(&self, request: PageRequest) -> AttendanceResult<Page<AttendanceDetail>> {
        let filter = AttendanceFilter::default();
        let total = self.store.count(&filter)?;
        let records = self
            .store
            .find_many(&filter, request.skip(), Some(request.limit()))?;
        let details = self.expand(records, true)?;
        Ok(Page::new(details, total, request))
    }

    fn expand(
        &self,
        records: Vec<AttendanceRecord>,
        with_student: bool,
    ) -> AttendanceResult<Vec<AttendanceDetail>> {
        let mut students: HashMap<StudentId, Student> = HashMap::new();
        let mut subjects: HashMap<SubjectId, Subject> = HashMap::new();
        let mut details = Vec::with_capacity(records.len());

        for record in records {
            let student = if with_student {
                if !students.contains_key(&record.student_id) {
                    let loaded = self.require_student(record.student_id)?;
                    students.insert(record.student_id, loaded);
                }
                students.get(&record.student_id).cloned()
            } else {
                None
            };
            if !subjects.contains_key(&record.subject_id) {
                let loaded = self.require_subject(record.subject_id)?;
                subjects.insert(record.subject_id, loaded);
            }
            let subject = subjects[&record.subject_id].clone();

            details.push(AttendanceDetail {
                record,
                student,
                subject,
            });
        }

        Ok(details)
    }

    fn require_student(&self, id: StudentId) -> AttendanceResult<Student> {
        self.store.student(id)?.ok_or_else(|| {
            AttendanceError::Store(RepoError::InvalidData(format!(
                "attendance references missing student {id}"
            )))
        })
    }

    fn require_subject(&self, id: SubjectId) -> AttendanceResult<Subject> {
        self.store.subject(id)?.ok_or_else(|| {
            AttendanceError::Store(RepoError::InvalidData(format!(
                "attendance references missing subject {id}"
            )))
        })
    }
}

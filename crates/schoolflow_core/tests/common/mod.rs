#![allow(dead_code)]

use chrono::FixedOffset;
use schoolflow_core::{
    AttendanceDraft, AttendanceFilter, AttendanceId, AttendanceRecord, AttendanceStore,
    RepoError, RepoResult, Student, StudentId, Subject, SubjectId,
};
use std::cell::RefCell;
use std::collections::HashMap;
use uuid::Uuid;

/// In-memory attendance store with the same ordering contract as SQLite.
#[derive(Default)]
pub struct MemoryStore {
    records: RefCell<Vec<AttendanceRecord>>,
    students: HashMap<StudentId, Student>,
    subjects: HashMap<SubjectId, Subject>,
}

impl MemoryStore {
    pub fn add_student(&mut self, name: &str) -> StudentId {
        let id = Uuid::new_v4();
        self.students.insert(
            id,
            Student {
                id,
                name: name.to_string(),
                roll_number: format!("ROLL-{name}"),
                email: format!("{}@schoolflow.test", name.to_lowercase()),
                user_id: Uuid::new_v4(),
            },
        );
        id
    }

    pub fn add_subject(&mut self, name: &str) -> SubjectId {
        let id = Uuid::new_v4();
        self.subjects.insert(
            id,
            Subject {
                id,
                name: name.to_string(),
                code: name.to_string(),
            },
        );
        id
    }

    pub fn insert(&self, record: AttendanceRecord) {
        self.records.borrow_mut().push(record);
    }

    pub fn snapshot(&self) -> Vec<AttendanceRecord> {
        let mut records = self.records.borrow().clone();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }
}

impl AttendanceStore for MemoryStore {
    fn count(&self, filter: &AttendanceFilter) -> RepoResult<u64> {
        Ok(self
            .records
            .borrow()
            .iter()
            .filter(|record| filter.matches(record))
            .count() as u64)
    }

    fn find_many(
        &self,
        filter: &AttendanceFilter,
        skip: u64,
        take: Option<u32>,
    ) -> RepoResult<Vec<AttendanceRecord>> {
        let mut matching: Vec<AttendanceRecord> = self
            .records
            .borrow()
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.date_ms.cmp(&a.date_ms).then(a.id.cmp(&b.id)));

        let rows = matching.into_iter().skip(skip as usize);
        Ok(match take {
            Some(limit) => rows.take(limit as usize).collect(),
            None => rows.collect(),
        })
    }

    fn find_first(&self, filter: &AttendanceFilter) -> RepoResult<Option<AttendanceRecord>> {
        Ok(self.find_many(filter, 0, Some(1))?.into_iter().next())
    }

    fn create(&self, draft: &AttendanceDraft) -> RepoResult<AttendanceRecord> {
        let record = record_from(Uuid::new_v4(), draft);
        self.insert(record.clone());
        Ok(record)
    }

    fn update(&self, id: AttendanceId, draft: &AttendanceDraft) -> RepoResult<AttendanceRecord> {
        let mut records = self.records.borrow_mut();
        let slot = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(RepoError::NotFound(id))?;
        *slot = record_from(id, draft);
        Ok(slot.clone())
    }

    fn delete(&self, id: AttendanceId) -> RepoResult<()> {
        let mut records = self.records.borrow_mut();
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn student(&self, id: StudentId) -> RepoResult<Option<Student>> {
        Ok(self.students.get(&id).cloned())
    }

    fn subject(&self, id: SubjectId) -> RepoResult<Option<Subject>> {
        Ok(self.subjects.get(&id).cloned())
    }
}

fn record_from(id: AttendanceId, draft: &AttendanceDraft) -> AttendanceRecord {
    AttendanceRecord {
        id,
        student_id: draft.student_id,
        subject_id: draft.subject_id,
        date_ms: draft.date_ms,
        status: draft.status,
    }
}

pub fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

//! Demo data seeding and database summary.
//!
//! # Responsibility
//! - Reset the database to a known demo roster, attendance history and
//!   weekday timetable.
//! - Report row counts for quick verification.
//!
//! # Invariants
//! - Seeding runs in one transaction: either the full demo set exists or the
//!   previous contents are kept.
//! - Generated attendance is deterministic for a given `today`, with one row
//!   per (student, subject, day), well under the daily cap.

use crate::model::attendance::{AttendanceDraft, AttendanceStatus};
use crate::model::roster::{Role, Student, Subject, SubjectId, UserAccount};
use crate::model::timetable::parse_clock_label;
use crate::repo::attendance_repo::{
    AttendanceStore, RepoError, RepoResult, SqliteAttendanceStore,
};
use crate::repo::roster_repo::{RosterRepository, SqliteRosterRepository};
use crate::repo::timetable_repo::{
    NewTimetableEntry, SqliteTimetableRepository, TimetableRepository,
};
use chrono::{Days, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

pub const DEMO_SUBJECTS: [&str; 4] = ["ADA", "AP", "DBMS", "MATHS"];
pub const DEMO_STUDENT_COUNT: usize = 10;
pub const DEMO_ATTENDANCE_DAYS: u64 = 20;

/// (weekday, start, end, subject index, room)
const DEMO_TIMETABLE: [(u8, &str, &str, usize, &str); 16] = [
    (1, "9:00 AM", "10:00 AM", 0, "Room 101"),
    (1, "10:15 AM", "11:15 AM", 1, "Room 102"),
    (1, "11:30 AM", "12:30 PM", 2, "Room 103"),
    (2, "9:00 AM", "10:00 AM", 1, "Room 102"),
    (2, "10:15 AM", "11:15 AM", 3, "Room 104"),
    (2, "11:30 AM", "12:30 PM", 0, "Room 101"),
    (3, "9:00 AM", "10:00 AM", 2, "Room 103"),
    (3, "10:15 AM", "11:15 AM", 0, "Room 101"),
    (3, "11:30 AM", "12:30 PM", 1, "Room 102"),
    (3, "2:00 PM", "3:00 PM", 3, "Room 104"),
    (4, "9:00 AM", "10:00 AM", 3, "Room 104"),
    (4, "10:15 AM", "11:15 AM", 2, "Room 103"),
    (4, "11:30 AM", "12:30 PM", 0, "Room 101"),
    (5, "9:00 AM", "10:00 AM", 0, "Room 101"),
    (5, "10:15 AM", "11:15 AM", 1, "Room 102"),
    (5, "11:30 AM", "12:30 PM", 3, "Room 104"),
];

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSummary {
    pub users: u64,
    pub students: u64,
    pub subjects: u64,
    pub attendance: u64,
    pub timetable: u64,
}

/// Replaces all data with the demo set; attendance ends on `today`.
///
/// Attendance rows are stamped at 09:00 in the reference calendar.
pub fn seed_demo_data(
    conn: &Connection,
    today: NaiveDate,
    zone: FixedOffset,
) -> RepoResult<DatabaseSummary> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "DELETE FROM attendance;
         DELETE FROM timetable;
         DELETE FROM students;
         DELETE FROM users;
         DELETE FROM subjects;",
    )?;

    let roster = SqliteRosterRepository::try_new(&tx)?;
    let subjects = seed_subjects(&roster)?;
    let students = seed_students(&roster)?;

    let store = SqliteAttendanceStore::try_new(&tx)?;
    seed_attendance(&store, &students, &subjects, today, zone)?;

    let timetable = SqliteTimetableRepository::try_new(&tx)?;
    seed_timetable(&timetable, &subjects)?;

    let summary = database_summary(&tx)?;
    tx.commit()?;

    info!(
        "event=seed_demo module=seed status=ok students={} subjects={} attendance={} timetable={}",
        summary.students, summary.subjects, summary.attendance, summary.timetable
    );
    Ok(summary)
}

/// Counts rows in every table.
pub fn database_summary(conn: &Connection) -> RepoResult<DatabaseSummary> {
    let count = |table: &str| -> RepoResult<u64> {
        let value: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))?;
        Ok(u64::try_from(value).unwrap_or_default())
    };

    Ok(DatabaseSummary {
        users: count("users")?,
        students: count("students")?,
        subjects: count("subjects")?,
        attendance: count("attendance")?,
        timetable: count("timetable")?,
    })
}

fn seed_subjects(roster: &impl RosterRepository) -> RepoResult<Vec<Subject>> {
    let mut subjects = Vec::with_capacity(DEMO_SUBJECTS.len());
    for name in DEMO_SUBJECTS {
        let subject = Subject {
            id: Uuid::new_v4(),
            name: name.to_string(),
            code: name.to_string(),
        };
        roster.create_subject(&subject)?;
        subjects.push(subject);
    }
    Ok(subjects)
}

fn seed_students(roster: &impl RosterRepository) -> RepoResult<Vec<Student>> {
    let mut students = Vec::with_capacity(DEMO_STUDENT_COUNT);
    for index in 1..=DEMO_STUDENT_COUNT {
        let email = format!("student{index}@schoolflow.com");
        let user = UserAccount {
            id: Uuid::new_v4(),
            email: email.clone(),
            role: Role::Student,
        };
        let student = Student {
            id: Uuid::new_v4(),
            name: format!("Student {index}"),
            roll_number: format!("ROLL{}", 100 + index),
            email,
            user_id: user.id,
        };
        roster.create_student(&student, &user)?;
        students.push(student);
    }
    Ok(students)
}

fn seed_attendance(
    store: &impl AttendanceStore,
    students: &[Student],
    subjects: &[Subject],
    today: NaiveDate,
    zone: FixedOffset,
) -> RepoResult<()> {
    let class_time = NaiveTime::from_hms_opt(9, 0, 0)
        .ok_or_else(|| RepoError::InvalidData("invalid seed class time".to_string()))?;

    for offset in 0..DEMO_ATTENDANCE_DAYS {
        let day = today
            .checked_sub_days(Days::new(offset))
            .ok_or_else(|| RepoError::InvalidData(format!("seed day out of range: {today}")))?;
        let date_ms = zone
            .from_local_datetime(&day.and_time(class_time))
            .single()
            .map(|instant| instant.timestamp_millis())
            .ok_or_else(|| RepoError::InvalidData(format!("invalid seed instant on {day}")))?;

        for (student_index, student) in students.iter().enumerate() {
            for (subject_index, subject) in subjects.iter().enumerate() {
                store.create(&AttendanceDraft {
                    student_id: student.id,
                    subject_id: subject.id,
                    date_ms,
                    status: demo_status(offset, student_index, subject_index),
                })?;
            }
        }
    }
    Ok(())
}

fn seed_timetable(timetable: &impl TimetableRepository, subjects: &[Subject]) -> RepoResult<()> {
    for (day_of_week, start, end, subject_index, room) in DEMO_TIMETABLE {
        let subject_id: SubjectId = subjects
            .get(subject_index)
            .map(|subject| subject.id)
            .ok_or_else(|| RepoError::InvalidData(format!("no demo subject {subject_index}")))?;
        let (Some(start_minute), Some(end_minute)) =
            (parse_clock_label(start), parse_clock_label(end))
        else {
            return Err(RepoError::InvalidData(format!(
                "invalid demo timetable slot {start}-{end}"
            )));
        };

        timetable.create_entry(&NewTimetableEntry {
            id: Uuid::new_v4(),
            day_of_week,
            start_minute,
            end_minute,
            subject_id,
            room: room.to_string(),
        })?;
    }
    Ok(())
}

/// Roughly one absence in five, spread across days, students and subjects.
fn demo_status(day: u64, student: usize, subject: usize) -> AttendanceStatus {
    let mix = day as usize * 7 + student * 3 + subject * 2;
    if mix % 5 == 0 {
        AttendanceStatus::Absent
    } else {
        AttendanceStatus::Present
    }
}

//! Roster use-case service.
//!
//! # Responsibility
//! - Create, update, delete and page through students.
//! - Enforce email and roll-number uniqueness with specific errors.
//!
//! # Invariants
//! - Updates merge over the stored student; blank fields keep their value.
//! - A changed email may not belong to any other user account.
//! - A changed roll number may not belong to any other student.

use crate::model::roster::{
    Role, Student, StudentWithUser, Subject, UserAccount, UserId,
};
use crate::repo::attendance_repo::RepoError;
use crate::repo::roster_repo::RosterRepository;
use crate::service::pagination::{Page, PageRequest};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Debug)]
pub enum RosterServiceError {
    MissingField(&'static str),
    StudentNotFound(String),
    /// No student profile is owned by the given user account.
    ProfileNotFound(UserId),
    EmailInUse(String),
    RollNumberInUse(String),
    Repo(RepoError),
}

impl Display for RosterServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::StudentNotFound(id) => write!(f, "student not found: {id}"),
            Self::ProfileNotFound(user_id) => {
                write!(f, "student profile not found for user {user_id}")
            }
            Self::EmailInUse(_) => write!(f, "email already in use"),
            Self::RollNumberInUse(_) => write!(f, "roll number already in use"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RosterServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RosterServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::StudentNotFound(id.to_string()),
            other => Self::Repo(other),
        }
    }
}

pub type RosterResult<T> = Result<T, RosterServiceError>;

/// Raw student create request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudentInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub roll_number: Option<String>,
}

/// Raw student update; absent or blank fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub roll_number: Option<String>,
}

/// Student created together with its user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedStudent {
    pub student: Student,
    pub user: UserAccount,
}

pub struct RosterService<R: RosterRepository> {
    repo: R,
}

impl<R: RosterRepository> RosterService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a student and its `STUDENT` user account.
    pub fn create_student(&self, input: &NewStudentInput) -> RosterResult<CreatedStudent> {
        let name = required(&input.name, "name")?;
        let email = required(&input.email, "email")?;
        let roll_number = required(&input.roll_number, "rollNumber")?;

        if self.repo.find_user_by_email(email)?.is_some() {
            warn!("event=student_rejected module=roster reason=email_in_use");
            return Err(RosterServiceError::EmailInUse(email.to_string()));
        }
        if self.repo.find_student_by_roll_number(roll_number)?.is_some() {
            warn!("event=student_rejected module=roster reason=roll_number_in_use");
            return Err(RosterServiceError::RollNumberInUse(roll_number.to_string()));
        }

        let user = UserAccount {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role: Role::Student,
        };
        let student = Student {
            id: Uuid::new_v4(),
            name: name.to_string(),
            roll_number: roll_number.to_string(),
            email: email.to_string(),
            user_id: user.id,
        };
        self.repo.create_student(&student, &user)?;
        info!(
            "event=student_created module=roster student_id={} user_id={}",
            student.id, user.id
        );

        Ok(CreatedStudent { student, user })
    }

    /// Merges `patch` over the stored student.
    pub fn update_student(&self, student_id: &str, patch: &StudentPatch) -> RosterResult<Student> {
        let existing = self.existing_student(student_id)?;

        let mut updated = existing.clone();
        if let Some(name) = optional(&patch.name) {
            updated.name = name.to_string();
        }
        if let Some(email) = optional(&patch.email) {
            if email != existing.email {
                let taken = self
                    .repo
                    .find_user_by_email(email)?
                    .is_some_and(|user| user.id != existing.user_id);
                if taken {
                    warn!(
                        "event=student_rejected module=roster reason=email_in_use student_id={}",
                        existing.id
                    );
                    return Err(RosterServiceError::EmailInUse(email.to_string()));
                }
            }
            updated.email = email.to_string();
        }
        if let Some(roll_number) = optional(&patch.roll_number) {
            if roll_number != existing.roll_number {
                let taken = self
                    .repo
                    .find_student_by_roll_number(roll_number)?
                    .is_some_and(|other| other.id != existing.id);
                if taken {
                    warn!(
                        "event=student_rejected module=roster reason=roll_number_in_use student_id={}",
                        existing.id
                    );
                    return Err(RosterServiceError::RollNumberInUse(roll_number.to_string()));
                }
            }
            updated.roll_number = roll_number.to_string();
        }

        self.repo.update_student(&updated)?;
        info!(
            "event=student_updated module=roster student_id={}",
            updated.id
        );
        Ok(updated)
    }

    /// Deletes a student, its attendance and its user account.
    pub fn delete_student(&self, student_id: &str) -> RosterResult<()> {
        let existing = self.existing_student(student_id)?;
        self.repo.delete_student(existing.id)?;
        info!(
            "event=student_deleted module=roster student_id={}",
            existing.id
        );
        Ok(())
    }

    /// One page of students ordered by name.
    pub fn list_students(&self, request: PageRequest) -> RosterResult<Page<StudentWithUser>> {
        let total = self.repo.count_students()?;
        let students = self.repo.list_students(request.skip(), request.limit())?;
        Ok(Page::new(students, total, request))
    }

    /// Resolves the student profile owned by a user account.
    pub fn student_for_user(&self, user_id: UserId) -> RosterResult<Student> {
        self.repo
            .get_student_by_user(user_id)?
            .ok_or(RosterServiceError::ProfileNotFound(user_id))
    }

    pub fn list_subjects(&self) -> RosterResult<Vec<Subject>> {
        Ok(self.repo.list_subjects()?)
    }

    fn existing_student(&self, student_id: &str) -> RosterResult<Student> {
        let raw = student_id.trim();
        let not_found = || RosterServiceError::StudentNotFound(raw.to_string());
        let id = Uuid::parse_str(raw).map_err(|_| not_found())?;
        self.repo.get_student(id)?.ok_or_else(not_found)
    }
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> RosterResult<&'a str> {
    optional(value).ok_or(RosterServiceError::MissingField(field))
}

fn optional(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

//! Roster entities: user accounts, students and subjects.
//!
//! # Invariants
//! - A student owns exactly one `STUDENT` user account (1:1).
//! - Student email and roll number are unique across the roster.
//! - Subject names are unique.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;
pub type StudentId = Uuid;
pub type SubjectId = Uuid;

/// Role tag carried by every verified principal and user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Student => "STUDENT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ADMIN" => Some(Self::Admin),
            "STUDENT" => Some(Self::Student),
            _ => None,
        }
    }
}

/// Login identity backing a student profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

/// Student profile as stored in the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub roll_number: String,
    pub email: String,
    pub user_id: UserId,
}

/// Student joined with its user account, used by roster listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentWithUser {
    #[serde(flatten)]
    pub student: Student,
    pub user: UserAccount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub code: String,
}

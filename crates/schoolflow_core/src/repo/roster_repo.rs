//! Roster repository: user accounts, students and subjects.
//!
//! # Responsibility
//! - Persist students together with their owning user account.
//! - Provide lookups used by uniqueness checks in the roster service.
//!
//! # Invariants
//! - Student + user account writes happen in one transaction; inside a
//!   caller's open transaction they join it instead of nesting.
//! - Deleting a student removes its user account and (via FK cascade) its
//!   attendance rows.
//! - Student listing is deterministic: `name ASC, id ASC`.

use crate::model::roster::{
    Role, Student, StudentId, StudentWithUser, Subject, SubjectId, UserAccount, UserId,
};
use crate::repo::attendance_repo::{RepoError, RepoResult};
use crate::repo::{ensure_schema_current, parse_uuid_column};
use rusqlite::{params, Connection, OptionalExtension, Row};

const STUDENT_SELECT_SQL: &str = "SELECT id, name, roll_number, email, user_id FROM students";

/// Repository interface for roster CRUD.
pub trait RosterRepository {
    /// Inserts the user account and the student in one transaction.
    fn create_student(&self, student: &Student, user: &UserAccount) -> RepoResult<()>;
    /// Rewrites student fields and mirrors the email onto its user account.
    fn update_student(&self, student: &Student) -> RepoResult<()>;
    fn delete_student(&self, id: StudentId) -> RepoResult<()>;
    fn get_student(&self, id: StudentId) -> RepoResult<Option<Student>>;
    fn get_student_by_user(&self, user_id: UserId) -> RepoResult<Option<Student>>;
    fn find_student_by_roll_number(&self, roll_number: &str) -> RepoResult<Option<Student>>;
    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<UserAccount>>;
    fn list_students(&self, skip: u64, take: u32) -> RepoResult<Vec<StudentWithUser>>;
    fn count_students(&self) -> RepoResult<u64>;
    fn create_subject(&self, subject: &Subject) -> RepoResult<()>;
    fn list_subjects(&self) -> RepoResult<Vec<Subject>>;
}

/// SQLite-backed roster repository.
pub struct SqliteRosterRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRosterRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_current(conn)?;
        Ok(Self { conn })
    }
}

impl RosterRepository for SqliteRosterRepository<'_> {
    fn create_student(&self, student: &Student, user: &UserAccount) -> RepoResult<()> {
        atomic_write(self.conn, |conn| {
            conn.execute(
                "INSERT INTO users (id, email, role) VALUES (?1, ?2, ?3);",
                params![user.id.to_string(), user.email.as_str(), user.role.as_str()],
            )?;
            conn.execute(
                "INSERT INTO students (id, name, roll_number, email, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    student.id.to_string(),
                    student.name.as_str(),
                    student.roll_number.as_str(),
                    student.email.as_str(),
                    student.user_id.to_string(),
                ],
            )?;
            Ok(())
        })
    }

    fn update_student(&self, student: &Student) -> RepoResult<()> {
        atomic_write(self.conn, |conn| {
            let changed = conn.execute(
                "UPDATE students
                 SET name = ?1, roll_number = ?2, email = ?3
                 WHERE id = ?4;",
                params![
                    student.name.as_str(),
                    student.roll_number.as_str(),
                    student.email.as_str(),
                    student.id.to_string(),
                ],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound(student.id));
            }
            conn.execute(
                "UPDATE users SET email = ?1 WHERE id = ?2;",
                params![student.email.as_str(), student.user_id.to_string()],
            )?;
            Ok(())
        })
    }

    fn delete_student(&self, id: StudentId) -> RepoResult<()> {
        let Some(student) = self.get_student(id)? else {
            return Err(RepoError::NotFound(id));
        };

        atomic_write(self.conn, |conn| {
            conn.execute("DELETE FROM students WHERE id = ?1;", [id.to_string()])?;
            conn.execute(
                "DELETE FROM users WHERE id = ?1;",
                [student.user_id.to_string()],
            )?;
            Ok(())
        })
    }

    fn get_student(&self, id: StudentId) -> RepoResult<Option<Student>> {
        load_student(self.conn, id)
    }

    fn get_student_by_user(&self, user_id: UserId) -> RepoResult<Option<Student>> {
        query_one_student(
            self.conn,
            &format!("{STUDENT_SELECT_SQL} WHERE user_id = ?1;"),
            &user_id.to_string(),
        )
    }

    fn find_student_by_roll_number(&self, roll_number: &str) -> RepoResult<Option<Student>> {
        query_one_student(
            self.conn,
            &format!("{STUDENT_SELECT_SQL} WHERE roll_number = ?1;"),
            roll_number,
        )
    }

    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<UserAccount>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, email, role FROM users WHERE email = ?1;",
                [email],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, email, role)| decode_user(&id, email, &role))
            .transpose()
    }

    fn list_students(&self, skip: u64, take: u32) -> RepoResult<Vec<StudentWithUser>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                s.id,
                s.name,
                s.roll_number,
                s.email,
                s.user_id,
                u.email AS user_email,
                u.role AS user_role
             FROM students s
             INNER JOIN users u ON u.id = s.user_id
             ORDER BY s.name ASC, s.id ASC
             LIMIT ?1 OFFSET ?2;",
        )?;
        let mut rows = stmt.query(params![
            i64::from(take),
            i64::try_from(skip).unwrap_or(i64::MAX)
        ])?;

        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            let student = parse_student_row(row)?;
            let user_email: String = row.get("user_email")?;
            let user_role: String = row.get("user_role")?;
            let user = decode_user(&student.user_id.to_string(), user_email, &user_role)?;
            students.push(StudentWithUser { student, user });
        }
        Ok(students)
    }

    fn count_students(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM students;", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn create_subject(&self, subject: &Subject) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO subjects (id, name, code) VALUES (?1, ?2, ?3);",
            params![
                subject.id.to_string(),
                subject.name.as_str(),
                subject.code.as_str()
            ],
        )?;
        Ok(())
    }

    fn list_subjects(&self) -> RepoResult<Vec<Subject>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, code FROM subjects ORDER BY name ASC, id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut subjects = Vec::new();
        while let Some(row) = rows.next()? {
            subjects.push(parse_subject_row(row)?);
        }
        Ok(subjects)
    }
}

/// Runs `write` in its own transaction, or directly inside the caller's
/// transaction when one is already open on `conn`.
fn atomic_write<T>(
    conn: &Connection,
    write: impl FnOnce(&Connection) -> RepoResult<T>,
) -> RepoResult<T> {
    if !conn.is_autocommit() {
        return write(conn);
    }
    let tx = conn.unchecked_transaction()?;
    let value = write(&tx)?;
    tx.commit()?;
    Ok(value)
}

pub(crate) fn load_student(conn: &Connection, id: StudentId) -> RepoResult<Option<Student>> {
    query_one_student(
        conn,
        &format!("{STUDENT_SELECT_SQL} WHERE id = ?1;"),
        &id.to_string(),
    )
}

pub(crate) fn load_subject(conn: &Connection, id: SubjectId) -> RepoResult<Option<Subject>> {
    let mut stmt = conn.prepare("SELECT id, name, code FROM subjects WHERE id = ?1;")?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_subject_row(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn parse_subject_row(row: &Row<'_>) -> RepoResult<Subject> {
    let id_text: String = row.get("id")?;
    Ok(Subject {
        id: parse_uuid_column(&id_text, "subjects.id")?,
        name: row.get("name")?,
        code: row.get("code")?,
    })
}

fn query_one_student(conn: &Connection, sql: &str, key: &str) -> RepoResult<Option<Student>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([key])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_student_row(row)?)),
        None => Ok(None),
    }
}

fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let id_text: String = row.get("id")?;
    let user_text: String = row.get("user_id")?;
    Ok(Student {
        id: parse_uuid_column(&id_text, "students.id")?,
        name: row.get("name")?,
        roll_number: row.get("roll_number")?,
        email: row.get("email")?,
        user_id: parse_uuid_column(&user_text, "students.user_id")?,
    })
}

fn decode_user(id: &str, email: String, role: &str) -> RepoResult<UserAccount> {
    let role = Role::parse(role)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid role `{role}` in users.role")))?;
    Ok(UserAccount {
        id: parse_uuid_column(id, "users.id")?,
        email,
        role,
    })
}

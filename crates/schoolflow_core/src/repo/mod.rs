//! Repository layer: storage contracts and their SQLite implementations.
//!
//! # Responsibility
//! - Define the store interfaces the services are written against.
//! - Keep SQL and row decoding inside the persistence boundary.
//!
//! # Invariants
//! - Repositories never decide policy (caps, uniqueness); services do.
//! - Read paths reject malformed persisted rows instead of masking them.
//! - SQLite repositories refuse connections whose schema is not current.

pub mod attendance_repo;
pub mod roster_repo;
pub mod timetable_repo;

use crate::db::migrations::latest_version;
use attendance_repo::{RepoError, RepoResult};
use rusqlite::Connection;
use uuid::Uuid;

pub(crate) fn parse_uuid_column(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn ensure_schema_current(conn: &Connection) -> RepoResult<()> {
    let actual: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let expected = latest_version();
    if actual != expected {
        return Err(RepoError::UninitializedConnection {
            expected_version: expected,
            actual_version: actual,
        });
    }
    Ok(())
}

//! Domain model for rosters, attendance and timetables.
//!
//! # Responsibility
//! - Define the records shared by repositories, services and the API layer.
//! - Own the reference-calendar arithmetic used by the attendance cap.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID.
//! - Attendance instants are stored as epoch milliseconds; calendar days are
//!   derived from them, never stored.

pub mod attendance;
pub mod calendar;
pub mod roster;
pub mod timetable;

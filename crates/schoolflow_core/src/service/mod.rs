//! Use-case services.
//!
//! # Responsibility
//! - Hold the policy the repositories deliberately lack (caps, uniqueness,
//!   pagination defaults).
//! - Stay storage-agnostic: every service is generic over a repository trait.

pub mod attendance_guard;
pub mod attendance_service;
pub mod pagination;
pub mod roster_service;
pub mod timetable_service;

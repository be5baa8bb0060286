//! Domain types for student records.
//!
//! This module provides:
//! - Primitives: StudentId, Email
//! - `NewStudent` (not yet persisted, no identifier) and `Student` (persisted row)

pub mod primitives;
pub mod student;

pub use primitives::{Email, StudentId};
pub use student::{NewStudent, Student};

//! Database module for SQLite operations.
//!
//! This module provides:
//! - Database initialization and schema creation
//! - Explicit schema descriptors and the `students` table mapping
//! - Query builders and dynamically typed values
//! - `Session`, the transaction handle every operation runs on
//! - `Repository`, which opens sessions

pub mod migrations;
pub mod query;
pub mod repo;
pub mod schema;
pub mod session;
pub mod students;
pub mod value;

pub use migrations::init_db;
pub use query::{Aggregate, Assignment, Cmp, Direction, Filter, Order, Select, Update};
pub use repo::Repository;
pub use schema::{Column, ColumnDef, ColumnType, Constraint, IndexDef, Record, Table};
pub use session::Session;
pub use value::{Scalar, Value};

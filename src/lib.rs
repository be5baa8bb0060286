pub mod config;
pub mod db;
pub mod demo;
pub mod domain;
pub mod error;

pub use config::Config;
pub use db::{init_db, Repository, Session};
pub use domain::{Email, NewStudent, Student, StudentId};
pub use error::StoreError;

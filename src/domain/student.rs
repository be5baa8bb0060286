//! Student records: transient `NewStudent` and persisted `Student`.
//!
//! Every column except the primary key is nullable, so the fields are
//! optional. `NewStudent::new` fills them all in.

use crate::domain::{Email, StudentId};
use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// A student that has not been persisted yet. Carries no identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub grade: Option<i64>,
    pub birthday: Option<NaiveDateTime>,
    /// Defaults to the local time of construction.
    pub enrolled_date: Option<NaiveDateTime>,
}

impl NewStudent {
    /// Create a new student enrolled now.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        grade: i64,
        birthday: NaiveDateTime,
    ) -> Self {
        NewStudent {
            name: Some(name.into()),
            email: Some(Email::new(email)),
            grade: Some(grade),
            birthday: Some(birthday),
            enrolled_date: Some(now()),
        }
    }

    /// Override the enrollment date.
    pub fn enrolled_date(mut self, enrolled_date: NaiveDateTime) -> Self {
        self.enrolled_date = Some(enrolled_date);
        self
    }

    /// Attach the identifier assigned by the database.
    pub(crate) fn into_persisted(self, id: StudentId) -> Student {
        Student {
            id,
            name: self.name,
            email: self.email,
            grade: self.grade,
            birthday: self.birthday,
            enrolled_date: self.enrolled_date,
        }
    }
}

/// A snapshot of a persisted `students` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: Option<String>,
    pub email: Option<Email>,
    pub grade: Option<i64>,
    pub birthday: Option<NaiveDateTime>,
    pub enrolled_date: Option<NaiveDateTime>,
}

impl std::fmt::Display for Student {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Student {}: ", self.id)?;
        match &self.name {
            Some(name) => write!(f, "{}", name)?,
            None => write!(f, "None")?,
        }
        match self.grade {
            Some(grade) => write!(f, ", Grade {}", grade),
            None => write!(f, ", Grade None"),
        }
    }
}

/// Current local time truncated to whole seconds.
fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

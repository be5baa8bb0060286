//! Domain primitives: StudentId, Email.

use serde::{Deserialize, Serialize};

/// Database-assigned primary key of a persisted student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StudentId(pub i64);

impl StudentId {
    /// Create a StudentId from a raw rowid.
    pub fn new(id: i64) -> Self {
        StudentId(id)
    }

    /// Get the underlying rowid.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Email address. The length bound lives in the schema, not here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Email(pub String);

impl Email {
    /// Maximum length accepted by the `email` column.
    pub const MAX_LEN: usize = 55;

    /// Create an Email from a string.
    pub fn new(email: impl Into<String>) -> Self {
        Email(email.into())
    }

    /// Get the email as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//! Explicit schema descriptors and the row mapping trait.
//!
//! Tables are declared as static `Table` values whose `ColumnDef`s drive both
//! DDL generation and query rendering. Identifiers are only ever interpolated
//! from these descriptors; user data always travels as bind parameters.

use sqlx::sqlite::SqliteRow;

/// Declared SQL type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    /// Text bounded to at most `n` characters.
    VarChar(usize),
    /// Naive date-time stored as ISO-8601 text.
    DateTime,
}

impl ColumnType {
    pub fn sql(&self) -> String {
        match self {
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::VarChar(n) => format!("VARCHAR({})", n),
            ColumnType::DateTime => "DATETIME".to_string(),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, ColumnType::Integer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    PrimaryKey,
    NotNull,
}

/// A single column: name, type and constraints.
#[derive(Debug, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub constraints: &'static [Constraint],
}

/// Columns are passed around as references to their static descriptors.
pub type Column = &'static ColumnDef;

impl ColumnDef {
    pub fn is_primary_key(&self) -> bool {
        self.constraints.contains(&Constraint::PrimaryKey)
    }

    fn definition_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.ty.sql());
        for constraint in self.constraints {
            match constraint {
                Constraint::PrimaryKey => sql.push_str(" PRIMARY KEY"),
                Constraint::NotNull => sql.push_str(" NOT NULL"),
            }
        }
        // SQLite ignores VARCHAR lengths, so the bound is spelled out.
        if let ColumnType::VarChar(n) = self.ty {
            sql.push_str(&format!(" CHECK (length({}) <= {})", self.name, n));
        }
        sql
    }
}

/// Secondary index over one or more columns of a table.
#[derive(Debug, PartialEq, Eq)]
pub struct IndexDef {
    pub name: &'static str,
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub unique: bool,
}

impl IndexDef {
    pub fn create_sql(&self) -> String {
        format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if self.unique { "UNIQUE " } else { "" },
            self.name,
            self.table,
            self.columns.join(", ")
        )
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub indexes: &'static [IndexDef],
}

impl Table {
    pub fn contains(&self, column: &ColumnDef) -> bool {
        self.columns.iter().any(|c| std::ptr::eq(*c, column))
    }

    pub fn primary_key(&self) -> Option<Column> {
        self.columns.iter().copied().find(|c| c.is_primary_key())
    }

    pub fn create_table_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("    {}", c.definition_sql()))
            .collect::<Vec<_>>()
            .join(",\n");
        format!("CREATE TABLE IF NOT EXISTS {} (\n{}\n)", self.name, columns)
    }
}

/// A type persisted as one row of a `Table`.
pub trait Record: Sized {
    fn table() -> &'static Table;

    /// Build an instance from a row selecting every column of `table()`.
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error>;
}

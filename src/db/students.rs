//! Mapping between `Student` records and the `students` table.

use crate::db::schema::{ColumnDef, ColumnType, Constraint, IndexDef, Record, Table};
use crate::db::value::Value;
use crate::domain::{Email, NewStudent, Student, StudentId};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

pub static ID: ColumnDef = ColumnDef {
    name: "id",
    ty: ColumnType::Integer,
    constraints: &[Constraint::PrimaryKey],
};

pub static NAME: ColumnDef = ColumnDef {
    name: "name",
    ty: ColumnType::Text,
    constraints: &[],
};

pub static EMAIL: ColumnDef = ColumnDef {
    name: "email",
    ty: ColumnType::VarChar(Email::MAX_LEN),
    constraints: &[],
};

pub static GRADE: ColumnDef = ColumnDef {
    name: "grade",
    ty: ColumnType::Integer,
    constraints: &[],
};

pub static BIRTHDAY: ColumnDef = ColumnDef {
    name: "birthday",
    ty: ColumnType::DateTime,
    constraints: &[],
};

pub static ENROLLED_DATE: ColumnDef = ColumnDef {
    name: "enrolled_date",
    ty: ColumnType::DateTime,
    constraints: &[],
};

pub static STUDENTS: Table = Table {
    name: "students",
    columns: &[&ID, &NAME, &EMAIL, &GRADE, &BIRTHDAY, &ENROLLED_DATE],
    indexes: &[IndexDef {
        name: "index_name",
        table: "students",
        columns: &["name"],
        unique: false,
    }],
};

/// INSERT statement covering every column except the primary key.
pub(crate) fn insert_sql() -> String {
    let columns: Vec<&str> = STUDENTS
        .columns
        .iter()
        .filter(|c| !c.is_primary_key())
        .map(|c| c.name)
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        STUDENTS.name,
        columns.join(", "),
        vec!["?"; columns.len()].join(", ")
    )
}

impl NewStudent {
    /// Insert values in the column order of `insert_sql`.
    pub fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.name.clone()),
            Value::from(self.email.as_ref().map(|e| e.as_str())),
            Value::from(self.grade),
            Value::from(self.birthday),
            Value::from(self.enrolled_date),
        ]
    }
}

impl Record for Student {
    fn table() -> &'static Table {
        &STUDENTS
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Student {
            id: StudentId::new(row.try_get(ID.name)?),
            name: row.try_get(NAME.name)?,
            email: row
                .try_get::<Option<String>, _>(EMAIL.name)?
                .map(Email::new),
            grade: row.try_get(GRADE.name)?,
            birthday: row.try_get(BIRTHDAY.name)?,
            enrolled_date: row.try_get(ENROLLED_DATE.name)?,
        })
    }
}

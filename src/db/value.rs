//! Dynamically typed cells for bind parameters, projections and aggregates.

use crate::db::schema::ColumnType;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::Row;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl Value {
    pub(crate) fn bind<'q>(
        self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            Value::Null => query.bind(None::<i64>),
            Value::Integer(v) => query.bind(v),
            Value::Text(v) => query.bind(v),
            Value::DateTime(v) => query.bind(v),
        }
    }

    /// Decode cell `index` of `row` according to the declared column type.
    /// SQL NULL decodes to `Value::Null` for every type.
    pub(crate) fn decode(row: &SqliteRow, index: usize, ty: ColumnType) -> Result<Self, sqlx::Error> {
        Ok(match ty {
            ColumnType::Integer => row.try_get::<Option<i64>, _>(index)?.into(),
            ColumnType::Text | ColumnType::VarChar(_) => {
                row.try_get::<Option<String>, _>(index)?.into()
            }
            ColumnType::DateTime => row.try_get::<Option<NaiveDateTime>, _>(index)?.into(),
        })
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Result of an aggregate query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    /// `COUNT` and `SUM`.
    Integer(i64),
    /// `AVG`.
    Real(f64),
    /// `MIN` and `MAX`, typed like the aggregated column.
    Value(Value),
    /// Aggregate over no non-null values.
    Null,
}

impl Scalar {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Integer(v) | Scalar::Value(Value::Integer(v)) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Integer(v) => write!(f, "{}", v),
            Scalar::Real(v) => write!(f, "{}", v),
            Scalar::Value(v) => write!(f, "{}", v),
            Scalar::Null => write!(f, "None"),
        }
    }
}

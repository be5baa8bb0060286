//! Explicit unit of work over a single SQLite transaction.

use crate::db::query::{Aggregate, Select, Update};
use crate::db::schema::{Column, Record};
use crate::db::students;
use crate::db::value::{Scalar, Value};
use crate::domain::{NewStudent, Student, StudentId};
use crate::error::StoreError;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::{Row, Transaction};
use tracing::{debug, info};

/// A transaction handle carrying every read and write.
///
/// Staged students are inserted on `flush`, which every query runs first, so
/// they are visible to reads within the same session. They become `Student`s
/// with identifiers only when the session commits. Dropping a session without
/// committing rolls it back.
pub struct Session {
    tx: Transaction<'static, Sqlite>,
    pending: Vec<NewStudent>,
    flushed: Vec<Student>,
}

impl Session {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Session {
            tx,
            pending: Vec::new(),
            flushed: Vec::new(),
        }
    }

    /// Stage a student for insertion.
    pub fn add(&mut self, student: NewStudent) {
        self.pending.push(student);
    }

    /// Stage several students, preserving their order.
    pub fn add_all(&mut self, students: impl IntoIterator<Item = NewStudent>) {
        self.pending.extend(students);
    }

    /// Number of staged students not yet flushed.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Insert every staged student inside the transaction.
    ///
    /// # Errors
    /// Returns `ConstraintViolation` if a row breaks a schema constraint.
    pub async fn flush(&mut self) -> Result<(), StoreError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let sql = students::insert_sql();
        for student in std::mem::take(&mut self.pending) {
            let query = bind_all(sqlx::query(&sql), student.values());
            let result = query.execute(&mut *self.tx).await?;
            let id = StudentId::new(result.last_insert_rowid());
            debug!(id = %id, name = ?student.name, "flushed student");
            self.flushed.push(student.into_persisted(id));
        }
        Ok(())
    }

    /// Fetch every row matching `select` as full records.
    pub async fn all<R: Record>(&mut self, select: &Select) -> Result<Vec<R>, StoreError> {
        let table = R::table();
        if select.table != table {
            return Err(StoreError::InvalidQuery(format!(
                "select over {} cannot produce {} records",
                select.table.name, table.name
            )));
        }
        self.flush().await?;

        let (sql, binds) = select.render(table.columns)?;
        debug!(sql = %sql, "select");
        let rows = bind_all(sqlx::query(&sql), binds)
            .fetch_all(&mut *self.tx)
            .await?;

        let records = rows
            .iter()
            .map(R::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Fetch the first row of `select`, or `None` when nothing matches.
    pub async fn first<R: Record>(&mut self, select: &Select) -> Result<Option<R>, StoreError> {
        let limited = select.clone().limit(1);
        Ok(self.all(&limited).await?.into_iter().next())
    }

    /// Fetch only `columns` from every row matching `select`.
    pub async fn project(
        &mut self,
        columns: &[Column],
        select: &Select,
    ) -> Result<Vec<Vec<Value>>, StoreError> {
        self.flush().await?;

        let (sql, binds) = select.render(columns)?;
        debug!(sql = %sql, "projection");
        let rows = bind_all(sqlx::query(&sql), binds)
            .fetch_all(&mut *self.tx)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let cells = columns
                .iter()
                .enumerate()
                .map(|(i, column)| Value::decode(row, i, column.ty))
                .collect::<Result<Vec<_>, _>>()?;
            out.push(cells);
        }
        Ok(out)
    }

    /// Fetch a single column from every row matching `select`.
    pub async fn project_column(
        &mut self,
        column: Column,
        select: &Select,
    ) -> Result<Vec<Value>, StoreError> {
        let rows = self.project(&[column], select).await?;
        Ok(rows.into_iter().flatten().collect())
    }

    /// Compute `aggregate` over the rows matching `select`'s filter.
    pub async fn aggregate(
        &mut self,
        aggregate: Aggregate,
        select: &Select,
    ) -> Result<Scalar, StoreError> {
        self.flush().await?;

        let (sql, binds) = select.render_aggregate(&aggregate)?;
        debug!(sql = %sql, "aggregate");
        let row = bind_all(sqlx::query(&sql), binds)
            .fetch_one(&mut *self.tx)
            .await?;

        let scalar = match aggregate {
            Aggregate::Count(_) | Aggregate::Sum(_) => row
                .try_get::<Option<i64>, _>(0)?
                .map(Scalar::Integer)
                .unwrap_or(Scalar::Null),
            Aggregate::Avg(_) => row
                .try_get::<Option<f64>, _>(0)?
                .map(Scalar::Real)
                .unwrap_or(Scalar::Null),
            Aggregate::Min(column) | Aggregate::Max(column) => {
                match Value::decode(&row, 0, column.ty)? {
                    Value::Null => Scalar::Null,
                    value => Scalar::Value(value),
                }
            }
        };
        Ok(scalar)
    }

    /// Apply a bulk update. Returns the number of rows changed.
    ///
    /// Instances fetched earlier are not refreshed; re-read to observe the change.
    pub async fn update(&mut self, update: &Update) -> Result<u64, StoreError> {
        self.flush().await?;

        let (sql, binds) = update.render()?;
        debug!(sql = %sql, "update");
        let result = bind_all(sqlx::query(&sql), binds)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete a persisted student by primary key.
    ///
    /// # Errors
    /// Returns `NotFound` if the row no longer exists.
    pub async fn delete(&mut self, student: &Student) -> Result<(), StoreError> {
        self.flush().await?;

        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            students::STUDENTS.name,
            students::ID.name
        );
        debug!(sql = %sql, id = %student.id, "delete");
        let result = sqlx::query(&sql)
            .bind(student.id.as_i64())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("student {}", student.id)));
        }
        Ok(())
    }

    /// Flush, commit, and return the students inserted by this session in
    /// staging order.
    pub async fn commit(mut self) -> Result<Vec<Student>, StoreError> {
        self.flush().await?;
        self.tx.commit().await?;
        info!(inserted = self.flushed.len(), "session committed");
        Ok(self.flushed)
    }

    /// Discard staged and flushed changes.
    pub async fn rollback(self) -> Result<(), StoreError> {
        let discarded = self.pending.len() + self.flushed.len();
        self.tx.rollback().await?;
        info!(discarded, "session rolled back");
        Ok(())
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: Vec<Value>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = value.bind(query);
    }
    query
}

//! Query builders: filters, ordering, selects, aggregates and bulk updates.
//!
//! Builders are plain values; rendering validates that every referenced column
//! belongs to the target table and produces SQL with positional `?`
//! placeholders plus the values to bind, in order.

use crate::db::schema::{Column, ColumnDef, Table};
use crate::db::value::Value;
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Cmp {
    fn sql(&self) -> &'static str {
        match self {
            Cmp::Eq => "=",
            Cmp::Ne => "<>",
            Cmp::Lt => "<",
            Cmp::Le => "<=",
            Cmp::Gt => ">",
            Cmp::Ge => ">=",
        }
    }
}

/// Row predicate. Only conjunctions are supported.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Compare(Column, Cmp, Value),
    /// Raw SQL `LIKE` pattern.
    Like(Column, String),
    /// Substring match; wildcards in the needle match literally.
    Contains(Column, String),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: Column, value: impl Into<Value>) -> Self {
        Filter::Compare(column, Cmp::Eq, value.into())
    }

    pub fn ne(column: Column, value: impl Into<Value>) -> Self {
        Filter::Compare(column, Cmp::Ne, value.into())
    }

    pub fn lt(column: Column, value: impl Into<Value>) -> Self {
        Filter::Compare(column, Cmp::Lt, value.into())
    }

    pub fn le(column: Column, value: impl Into<Value>) -> Self {
        Filter::Compare(column, Cmp::Le, value.into())
    }

    pub fn gt(column: Column, value: impl Into<Value>) -> Self {
        Filter::Compare(column, Cmp::Gt, value.into())
    }

    pub fn ge(column: Column, value: impl Into<Value>) -> Self {
        Filter::Compare(column, Cmp::Ge, value.into())
    }

    pub fn like(column: Column, pattern: impl Into<String>) -> Self {
        Filter::Like(column, pattern.into())
    }

    pub fn contains(column: Column, needle: impl Into<String>) -> Self {
        Filter::Contains(column, needle.into())
    }

    /// Conjunction of `self` and `other`, flattening nested `And`s.
    pub fn and(self, other: Filter) -> Self {
        let mut parts = match self {
            Filter::And(parts) => parts,
            f => vec![f],
        };
        match other {
            Filter::And(more) => parts.extend(more),
            f => parts.push(f),
        }
        Filter::And(parts)
    }

    fn render(&self, table: &Table, sql: &mut String, binds: &mut Vec<Value>) -> Result<(), StoreError> {
        match self {
            Filter::Compare(column, cmp, value) => {
                check_column(table, column)?;
                sql.push_str(&format!("{} {} ?", column.name, cmp.sql()));
                binds.push(value.clone());
            }
            Filter::Like(column, pattern) => {
                check_column(table, column)?;
                sql.push_str(&format!("{} LIKE ?", column.name));
                binds.push(Value::Text(pattern.clone()));
            }
            Filter::Contains(column, needle) => {
                check_column(table, column)?;
                sql.push_str(&format!("{} LIKE ? ESCAPE '\\'", column.name));
                binds.push(Value::Text(format!("%{}%", escape_like(needle))));
            }
            Filter::And(parts) if parts.is_empty() => sql.push('1'),
            Filter::And(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(" AND ");
                    }
                    let nested = matches!(part, Filter::And(p) if p.len() > 1);
                    if nested {
                        sql.push('(');
                    }
                    part.render(table, sql, binds)?;
                    if nested {
                        sql.push(')');
                    }
                }
            }
        }
        Ok(())
    }
}

fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn check_column(table: &Table, column: &ColumnDef) -> Result<(), StoreError> {
    if table.contains(column) {
        Ok(())
    } else {
        Err(StoreError::InvalidQuery(format!(
            "column {} does not belong to table {}",
            column.name, table.name
        )))
    }
}

fn render_where(
    table: &Table,
    filter: Option<&Filter>,
    sql: &mut String,
    binds: &mut Vec<Value>,
) -> Result<(), StoreError> {
    if let Some(filter) = filter {
        sql.push_str(" WHERE ");
        filter.render(table, sql, binds)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: Column,
    pub direction: Direction,
}

impl Order {
    pub fn asc(column: Column) -> Self {
        Order {
            column,
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: Column) -> Self {
        Order {
            column,
            direction: Direction::Desc,
        }
    }

    fn sql(&self) -> String {
        match self.direction {
            Direction::Asc => format!("{} ASC", self.column.name),
            Direction::Desc => format!("{} DESC", self.column.name),
        }
    }
}

/// SELECT over a single table.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: &'static Table,
    pub filter: Option<Filter>,
    pub orders: Vec<Order>,
    pub limit: Option<u32>,
}

impl Select {
    pub fn new(table: &'static Table) -> Self {
        Select {
            table,
            filter: None,
            orders: Vec::new(),
            limit: None,
        }
    }

    /// Add a predicate; repeated calls are ANDed together.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render with the given projection columns.
    ///
    /// The primary key is always the last ordering key: with no explicit
    /// order rows come back in insertion order, and rows with equal keys
    /// come back in a stable order. SQLite would otherwise follow whichever
    /// index it picks for the scan.
    pub(crate) fn render(&self, columns: &[Column]) -> Result<(String, Vec<Value>), StoreError> {
        if columns.is_empty() {
            return Err(StoreError::InvalidQuery("empty projection".to_string()));
        }
        for column in columns {
            check_column(self.table, column)?;
        }
        let projection = columns
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("SELECT {} FROM {}", projection, self.table.name);
        let mut binds = Vec::new();
        render_where(self.table, self.filter.as_ref(), &mut sql, &mut binds)?;

        let mut keys = Vec::with_capacity(self.orders.len() + 1);
        for order in &self.orders {
            check_column(self.table, order.column)?;
            keys.push(order.sql());
        }
        if let Some(pk) = self.table.primary_key() {
            if !self.orders.iter().any(|o| std::ptr::eq(o.column, pk)) {
                keys.push(Order::asc(pk).sql());
            }
        }
        if !keys.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        Ok((sql, binds))
    }

    /// Render an aggregate over the filtered rows. Orders and limit do not apply.
    pub(crate) fn render_aggregate(&self, aggregate: &Aggregate) -> Result<(String, Vec<Value>), StoreError> {
        let expression = aggregate.expression(self.table)?;
        let mut sql = format!("SELECT {} FROM {}", expression, self.table.name);
        let mut binds = Vec::new();
        render_where(self.table, self.filter.as_ref(), &mut sql, &mut binds)?;
        Ok((sql, binds))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregate {
    /// `COUNT(*)` when no column is given.
    Count(Option<Column>),
    Sum(Column),
    Avg(Column),
    Min(Column),
    Max(Column),
}

impl Aggregate {
    fn expression(&self, table: &Table) -> Result<String, StoreError> {
        let (function, column) = match self {
            Aggregate::Count(None) => return Ok("COUNT(*)".to_string()),
            Aggregate::Count(Some(column)) => ("COUNT", column),
            Aggregate::Sum(column) => ("SUM", column),
            Aggregate::Avg(column) => ("AVG", column),
            Aggregate::Min(column) => ("MIN", column),
            Aggregate::Max(column) => ("MAX", column),
        };
        check_column(table, column)?;
        // MIN and MAX compare any type; sums and averages need numbers.
        if matches!(self, Aggregate::Sum(_) | Aggregate::Avg(_)) && !column.ty.is_integer() {
            return Err(StoreError::InvalidQuery(format!(
                "{} requires an integer column, got {}",
                function, column.name
            )));
        }
        Ok(format!("{}({})", function, column.name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Set(Column, Value),
    Increment(Column, i64),
}

/// Bulk UPDATE. Without a filter every row is updated.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: &'static Table,
    pub assignments: Vec<Assignment>,
    pub filter: Option<Filter>,
}

impl Update {
    pub fn new(table: &'static Table) -> Self {
        Update {
            table,
            assignments: Vec::new(),
            filter: None,
        }
    }

    pub fn set(mut self, column: Column, value: impl Into<Value>) -> Self {
        self.assignments.push(Assignment::Set(column, value.into()));
        self
    }

    pub fn increment(mut self, column: Column, by: i64) -> Self {
        self.assignments.push(Assignment::Increment(column, by));
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    pub(crate) fn render(&self) -> Result<(String, Vec<Value>), StoreError> {
        if self.assignments.is_empty() {
            return Err(StoreError::InvalidQuery("update without assignments".to_string()));
        }

        let mut sets = Vec::with_capacity(self.assignments.len());
        let mut binds = Vec::new();
        for assignment in &self.assignments {
            let column = match assignment {
                Assignment::Set(column, _) | Assignment::Increment(column, _) => *column,
            };
            check_column(self.table, column)?;
            if column.is_primary_key() {
                return Err(StoreError::InvalidQuery(format!(
                    "primary key {} cannot be updated",
                    column.name
                )));
            }
            match assignment {
                Assignment::Set(column, value) => {
                    sets.push(format!("{} = ?", column.name));
                    binds.push(value.clone());
                }
                Assignment::Increment(column, by) => {
                    if !column.ty.is_integer() {
                        return Err(StoreError::InvalidQuery(format!(
                            "cannot increment non-integer column {}",
                            column.name
                        )));
                    }
                    sets.push(format!("{0} = {0} + ?", column.name));
                    binds.push(Value::Integer(*by));
                }
            }
        }

        let mut sql = format!("UPDATE {} SET {}", self.table.name, sets.join(", "));
        render_where(self.table, self.filter.as_ref(), &mut sql, &mut binds)?;
        Ok((sql, binds))
    }
}

//! The student records walkthrough: create, query, update and delete, printing
//! a line after each step.

use crate::db::students::{BIRTHDAY, GRADE, ID, NAME, STUDENTS};
use crate::db::{Aggregate, Filter, Order, Repository, Select, Update, Value};
use crate::domain::{NewStudent, Student};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::io::Write;
use tracing::info;

/// Run every step against `repo`, writing results to `out`.
pub async fn run(repo: &Repository, out: &mut impl Write) -> Result<()> {
    // Create
    let mut session = repo.begin().await?;
    session.add_all([
        NewStudent::new(
            "Albert Einstein",
            "albert.einstein@zurich.edu",
            6,
            date(1879, 3, 14)?,
        ),
        NewStudent::new(
            "Alan Turing",
            "alan.turing@sherborne.edu",
            11,
            date(1912, 6, 23)?,
        ),
    ]);
    let created = session.commit().await.context("creating students")?;
    for student in &created {
        writeln!(out, "New student ID is {}.", student.id)?;
    }
    info!(count = created.len(), "students created");

    // Read
    let mut session = repo.begin().await?;
    let everyone = Select::new(&STUDENTS);

    let all: Vec<Student> = session.all(&everyone).await?;
    writeln!(out, "{}", format_students(&all))?;

    let names = session.project(&[&NAME], &everyone).await?;
    writeln!(out, "{}", format_rows(&names))?;

    let by_name = everyone.clone().order_by(Order::asc(&NAME));
    let names = session.project(&[&NAME], &by_name).await?;
    writeln!(out, "{}", format_rows(&names))?;

    let by_grade = everyone.clone().order_by(Order::desc(&GRADE));
    let rows = session.project(&[&NAME, &GRADE], &by_grade).await?;
    writeln!(out, "{}", format_rows(&rows))?;

    let oldest = everyone.clone().order_by(Order::asc(&BIRTHDAY)).limit(1);
    let rows = session.project(&[&NAME, &BIRTHDAY], &oldest).await?;
    match rows.first() {
        Some(row) => writeln!(out, "{}", format_row(row))?,
        None => writeln!(out, "None")?,
    }

    let count = session
        .aggregate(Aggregate::Count(Some(&ID)), &everyone)
        .await?;
    writeln!(out, "({})", count)?;

    let alan_in_eleventh = everyone
        .clone()
        .filter(Filter::contains(&NAME, "Alan"))
        .filter(Filter::eq(&GRADE, 11));
    let matches: Vec<Student> = session.all(&alan_in_eleventh).await?;
    for record in &matches {
        writeln!(out, "{}", Value::from(record.name.clone()))?;
    }
    session.commit().await?;

    // Update
    let mut session = repo.begin().await?;
    let changed = session
        .update(&Update::new(&STUDENTS).increment(&GRADE, 1))
        .await?;
    session.commit().await.context("incrementing grades")?;
    info!(changed, "grades incremented");

    let mut session = repo.begin().await?;
    let rows = session.project(&[&NAME, &GRADE], &everyone).await?;
    writeln!(out, "{}", format_rows(&rows))?;
    session.commit().await?;

    // Delete
    let einstein = everyone
        .clone()
        .filter(Filter::eq(&NAME, "Albert Einstein"));
    let mut session = repo.begin().await?;
    match session.first::<Student>(&einstein).await? {
        Some(student) => {
            session.delete(&student).await?;
            session.commit().await.context("deleting student")?;
            info!(id = %student.id, "student deleted");
        }
        None => session.rollback().await?,
    }

    let mut session = repo.begin().await?;
    let after: Option<Student> = session.first(&einstein).await?;
    match after {
        Some(student) => writeln!(out, "{}", student)?,
        None => writeln!(out, "None")?,
    }
    session.commit().await?;

    Ok(())
}

fn date(year: i32, month: u32, day: u32) -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .with_context(|| format!("invalid date {}-{}-{}", year, month, day))
}

fn format_students(students: &[Student]) -> String {
    let items: Vec<String> = students.iter().map(|s| s.to_string()).collect();
    format!("[{}]", items.join(", "))
}

fn format_row(row: &[Value]) -> String {
    let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
    format!("({})", cells.join(", "))
}

fn format_rows(rows: &[Vec<Value>]) -> String {
    let items: Vec<String> = rows.iter().map(|row| format_row(row)).collect();
    format!("[{}]", items.join(", "))
}

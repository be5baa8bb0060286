//! Integration tests for sessions against an in-memory database.

use chrono::{NaiveDate, NaiveDateTime};
use student_records::{
    config::Config,
    db::{
        init_db,
        students::{BIRTHDAY, EMAIL, GRADE, ID, NAME, STUDENTS},
        Aggregate, Filter, Order, Repository, Scalar, Select, Update, Value,
    },
    NewStudent, StoreError, Student,
};
use tempfile::TempDir;

async fn setup_test_db() -> Repository {
    let pool = init_db(&Config::default()).await.expect("init_db failed");
    Repository::new(pool)
}

fn date(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn einstein() -> NewStudent {
    NewStudent::new(
        "Albert Einstein",
        "albert.einstein@zurich.edu",
        6,
        date(1879, 3, 14),
    )
    .enrolled_date(date(1890, 9, 1))
}

fn turing() -> NewStudent {
    NewStudent::new(
        "Alan Turing",
        "alan.turing@sherborne.edu",
        11,
        date(1912, 6, 23),
    )
    .enrolled_date(date(1926, 9, 1))
}

async fn seed(repo: &Repository) -> Vec<Student> {
    let mut session = repo.begin().await.unwrap();
    session.add_all([einstein(), turing()]);
    session.commit().await.expect("commit failed")
}

async fn count(repo: &Repository) -> i64 {
    let mut session = repo.begin().await.unwrap();
    let scalar = session
        .aggregate(Aggregate::Count(Some(&ID)), &Select::new(&STUDENTS))
        .await
        .unwrap();
    session.commit().await.unwrap();
    scalar.as_i64().unwrap()
}

#[tokio::test]
async fn test_commit_assigns_distinct_ids() {
    let repo = setup_test_db().await;
    let created = seed(&repo).await;

    assert_eq!(created.len(), 2);
    assert_ne!(created[0].id, created[1].id);
    assert_eq!(created[0].name.as_deref(), Some("Albert Einstein"));
    assert_eq!(created[1].name.as_deref(), Some("Alan Turing"));
}

#[tokio::test]
async fn test_duplicate_names_are_allowed() {
    let repo = setup_test_db().await;
    let mut session = repo.begin().await.unwrap();
    session.add_all([turing(), turing()]);
    let created = session.commit().await.expect("name index is not unique");

    assert_eq!(created.len(), 2);
    assert_ne!(created[0].id, created[1].id);
    assert_eq!(count(&repo).await, 2);
}

#[tokio::test]
async fn test_read_all_matches_inserted_values() {
    let repo = setup_test_db().await;
    let created = seed(&repo).await;

    let mut session = repo.begin().await.unwrap();
    let all: Vec<Student> = session.all(&Select::new(&STUDENTS)).await.unwrap();

    assert_eq!(all, created);
    assert_eq!(
        all[1].email.as_ref().map(|e| e.as_str()),
        Some("alan.turing@sherborne.edu")
    );
    assert_eq!(all[1].birthday, Some(date(1912, 6, 23)));
    assert_eq!(all[1].enrolled_date, Some(date(1926, 9, 1)));
}

#[tokio::test]
async fn test_projection_follows_read_all_order() {
    let repo = setup_test_db().await;
    seed(&repo).await;

    let mut session = repo.begin().await.unwrap();
    let select = Select::new(&STUDENTS);
    let all: Vec<Student> = session.all(&select).await.unwrap();
    let names = session.project_column(&NAME, &select).await.unwrap();

    // Insertion order differs from name order, which the name index would give.
    assert_eq!(
        names,
        vec![Value::from("Albert Einstein"), Value::from("Alan Turing")]
    );
    let expected: Vec<Value> = all.iter().map(|s| Value::from(s.name.clone())).collect();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn test_order_by_name_ascending() {
    let repo = setup_test_db().await;
    seed(&repo).await;

    let mut session = repo.begin().await.unwrap();
    let names = session
        .project_column(&NAME, &Select::new(&STUDENTS).order_by(Order::asc(&NAME)))
        .await
        .unwrap();

    assert_eq!(
        names,
        vec![Value::from("Alan Turing"), Value::from("Albert Einstein")]
    );
}

#[tokio::test]
async fn test_order_by_grade_descending() {
    let repo = setup_test_db().await;
    seed(&repo).await;

    let mut session = repo.begin().await.unwrap();
    let rows = session
        .project(
            &[&NAME, &GRADE],
            &Select::new(&STUDENTS).order_by(Order::desc(&GRADE)),
        )
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![
            vec![Value::from("Alan Turing"), Value::from(11)],
            vec![Value::from("Albert Einstein"), Value::from(6)],
        ]
    );
}

#[tokio::test]
async fn test_first_by_birthday_is_oldest() {
    let repo = setup_test_db().await;
    seed(&repo).await;

    let mut session = repo.begin().await.unwrap();
    let oldest: Option<Student> = session
        .first(&Select::new(&STUDENTS).order_by(Order::asc(&BIRTHDAY)))
        .await
        .unwrap();

    let oldest = oldest.expect("expected a student");
    assert_eq!(oldest.name.as_deref(), Some("Albert Einstein"));
    assert_eq!(oldest.birthday, Some(date(1879, 3, 14)));
}

#[tokio::test]
async fn test_equal_order_keys_break_ties_by_id() {
    let repo = setup_test_db().await;
    let mut session = repo.begin().await.unwrap();
    session.add_all([
        NewStudent::new("Grace Hopper", "hopper@example.com", 9, date(1906, 12, 9)),
        NewStudent::new("Ada Lovelace", "lovelace@example.com", 9, date(1815, 12, 10)),
    ]);
    let created = session.commit().await.unwrap();

    let mut session = repo.begin().await.unwrap();
    let ordered: Vec<Student> = session
        .all(&Select::new(&STUDENTS).order_by(Order::desc(&GRADE)))
        .await
        .unwrap();

    assert_eq!(ordered[0].id, created[0].id);
    assert_eq!(ordered[1].id, created[1].id);
}

#[tokio::test]
async fn test_count_before_and_after_delete() {
    let repo = setup_test_db().await;
    let created = seed(&repo).await;
    assert_eq!(count(&repo).await, 2);

    let mut session = repo.begin().await.unwrap();
    session.delete(&created[0]).await.unwrap();
    session.commit().await.unwrap();

    assert_eq!(count(&repo).await, 1);
}

#[tokio::test]
async fn test_numeric_aggregates() {
    let repo = setup_test_db().await;
    seed(&repo).await;

    let mut session = repo.begin().await.unwrap();
    let select = Select::new(&STUDENTS);
    assert_eq!(
        session.aggregate(Aggregate::Sum(&GRADE), &select).await.unwrap(),
        Scalar::Integer(17)
    );
    assert_eq!(
        session.aggregate(Aggregate::Max(&GRADE), &select).await.unwrap(),
        Scalar::Value(Value::from(11))
    );
    assert_eq!(
        session.aggregate(Aggregate::Avg(&GRADE), &select).await.unwrap(),
        Scalar::Real(8.5)
    );
    assert_eq!(
        session.aggregate(Aggregate::Count(None), &select).await.unwrap(),
        Scalar::Integer(2)
    );

    let nobody = select.filter(Filter::gt(&GRADE, 100));
    assert_eq!(
        session.aggregate(Aggregate::Min(&GRADE), &nobody).await.unwrap(),
        Scalar::Null
    );
}

#[tokio::test]
async fn test_min_max_keep_column_type() {
    let repo = setup_test_db().await;
    seed(&repo).await;

    let mut session = repo.begin().await.unwrap();
    let select = Select::new(&STUDENTS);
    assert_eq!(
        session.aggregate(Aggregate::Min(&BIRTHDAY), &select).await.unwrap(),
        Scalar::Value(Value::from(date(1879, 3, 14)))
    );
    assert_eq!(
        session.aggregate(Aggregate::Max(&NAME), &select).await.unwrap(),
        Scalar::Value(Value::from("Albert Einstein"))
    );
}

#[tokio::test]
async fn test_null_columns_round_trip() {
    let repo = setup_test_db().await;
    let mut session = repo.begin().await.unwrap();
    session.add(NewStudent {
        name: Some("Nameless".to_string()),
        email: None,
        grade: None,
        birthday: None,
        enrolled_date: None,
    });
    let created = session.commit().await.unwrap();

    let mut session = repo.begin().await.unwrap();
    let all: Vec<Student> = session.all(&Select::new(&STUDENTS)).await.unwrap();
    assert_eq!(all, created);
    assert_eq!(all[0].to_string(), format!("Student {}: Nameless, Grade None", all[0].id));
    assert_eq!(
        session.aggregate(Aggregate::Sum(&GRADE), &Select::new(&STUDENTS)).await.unwrap(),
        Scalar::Null
    );
}

#[tokio::test]
async fn test_conjunctive_filter_returns_only_match() {
    let repo = setup_test_db().await;
    let created = seed(&repo).await;

    let mut session = repo.begin().await.unwrap();
    let matches: Vec<Student> = session
        .all(
            &Select::new(&STUDENTS)
                .filter(Filter::contains(&NAME, "Alan"))
                .filter(Filter::eq(&GRADE, 11)),
        )
        .await
        .unwrap();
    assert_eq!(matches, vec![created[1].clone()]);

    let none: Vec<Student> = session
        .all(
            &Select::new(&STUDENTS)
                .filter(Filter::contains(&NAME, "Alan"))
                .filter(Filter::eq(&GRADE, 6)),
        )
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_contains_treats_wildcards_literally() {
    let repo = setup_test_db().await;
    seed(&repo).await;

    let mut session = repo.begin().await.unwrap();
    let matches: Vec<Student> = session
        .all(&Select::new(&STUDENTS).filter(Filter::contains(&NAME, "A%")))
        .await
        .unwrap();
    assert!(matches.is_empty());

    let pattern: Vec<Student> = session
        .all(&Select::new(&STUDENTS).filter(Filter::like(&NAME, "A%")))
        .await
        .unwrap();
    assert_eq!(pattern.len(), 2);
}

#[tokio::test]
async fn test_bulk_increment_updates_every_row() {
    let repo = setup_test_db().await;
    let before = seed(&repo).await;

    let mut session = repo.begin().await.unwrap();
    let changed = session
        .update(&Update::new(&STUDENTS).increment(&GRADE, 1))
        .await
        .unwrap();
    session.commit().await.unwrap();
    assert_eq!(changed, 2);

    let mut session = repo.begin().await.unwrap();
    let after: Vec<Student> = session.all(&Select::new(&STUDENTS)).await.unwrap();
    for (old, new) in before.iter().zip(after.iter()) {
        assert_eq!(old.id, new.id);
        assert_eq!(new.grade, old.grade.map(|g| g + 1));
    }
}

#[tokio::test]
async fn test_filtered_update_leaves_other_rows() {
    let repo = setup_test_db().await;
    seed(&repo).await;

    let mut session = repo.begin().await.unwrap();
    let changed = session
        .update(
            &Update::new(&STUDENTS)
                .set(&EMAIL, "alan@example.com")
                .filter(Filter::eq(&NAME, "Alan Turing")),
        )
        .await
        .unwrap();
    assert_eq!(changed, 1);

    let emails = session
        .project_column(&EMAIL, &Select::new(&STUDENTS).order_by(Order::asc(&ID)))
        .await
        .unwrap();
    assert_eq!(
        emails,
        vec![
            Value::from("albert.einstein@zurich.edu"),
            Value::from("alan@example.com")
        ]
    );
}

#[tokio::test]
async fn test_delete_then_lookup_is_absent() {
    let repo = setup_test_db().await;
    seed(&repo).await;
    let by_name = Select::new(&STUDENTS).filter(Filter::eq(&NAME, "Alan Turing"));

    let mut session = repo.begin().await.unwrap();
    let student: Student = session.first(&by_name).await.unwrap().expect("seeded");
    session.delete(&student).await.unwrap();
    session.commit().await.unwrap();

    let mut session = repo.begin().await.unwrap();
    let again: Option<Student> = session.first(&by_name).await.unwrap();
    assert!(again.is_none());
    let again: Option<Student> = session.first(&by_name).await.unwrap();
    assert!(again.is_none());
}

#[tokio::test]
async fn test_delete_missing_row_is_not_found() {
    let repo = setup_test_db().await;
    let created = seed(&repo).await;

    let mut session = repo.begin().await.unwrap();
    session.delete(&created[1]).await.unwrap();
    let err = session.delete(&created[1]).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn test_staged_rows_visible_within_session() {
    let repo = setup_test_db().await;

    let mut session = repo.begin().await.unwrap();
    session.add(einstein());
    assert_eq!(session.pending_count(), 1);

    let all: Vec<Student> = session.all(&Select::new(&STUDENTS)).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(session.pending_count(), 0);

    let created = session.commit().await.unwrap();
    assert_eq!(created, all);
}

#[tokio::test]
async fn test_rollback_discards_changes() {
    let repo = setup_test_db().await;
    seed(&repo).await;

    let mut session = repo.begin().await.unwrap();
    session.add(NewStudent::new(
        "Grace Hopper",
        "hopper@example.com",
        9,
        date(1906, 12, 9),
    ));
    session.flush().await.unwrap();
    session
        .update(&Update::new(&STUDENTS).increment(&GRADE, 10))
        .await
        .unwrap();
    session.rollback().await.unwrap();

    assert_eq!(count(&repo).await, 2);
    let mut session = repo.begin().await.unwrap();
    let grades = session
        .project_column(&GRADE, &Select::new(&STUDENTS))
        .await
        .unwrap();
    assert_eq!(grades, vec![Value::from(6), Value::from(11)]);
}

#[tokio::test]
async fn test_dropped_session_rolls_back() {
    let repo = setup_test_db().await;

    {
        let mut session = repo.begin().await.unwrap();
        session.add(einstein());
        session.flush().await.unwrap();
    }

    assert_eq!(count(&repo).await, 0);
}

#[tokio::test]
async fn test_overlong_email_is_constraint_violation() {
    let repo = setup_test_db().await;

    let mut session = repo.begin().await.unwrap();
    let long_email = format!("{}@example.com", "a".repeat(60));
    session.add(NewStudent::new("Long Email", long_email, 1, date(2000, 1, 1)));

    let err = session.commit().await.unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_invalid_queries_are_rejected() {
    let repo = setup_test_db().await;

    let mut session = repo.begin().await.unwrap();
    let err = session
        .aggregate(Aggregate::Sum(&NAME), &Select::new(&STUDENTS))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidQuery(_)));

    let err = session
        .update(&Update::new(&STUDENTS).increment(&BIRTHDAY, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidQuery(_)));
}

#[tokio::test]
async fn test_file_database_persists_across_pools() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config {
        database_path: temp_dir
            .path()
            .join("students.db")
            .to_string_lossy()
            .to_string(),
        max_connections: 2,
    };

    let repo = Repository::new(init_db(&config).await.expect("init_db failed"));
    seed(&repo).await;
    repo.pool().close().await;

    let repo = Repository::new(init_db(&config).await.expect("reopen failed"));
    assert_eq!(count(&repo).await, 2);
}

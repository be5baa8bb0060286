//! Database initialization: pool, pragmas and schema.

use crate::config::Config;
use crate::db::students::STUDENTS;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Open the database described by `config` and create the schema.
pub async fn init_db(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = config.is_in_memory();

    let options = if in_memory {
        SqliteConnectOptions::from_str("sqlite::memory:")?
    } else {
        if let Some(parent) = Path::new(&config.database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }
        SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(true)
    };

    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .after_connect(move |conn, _meta| {
            Box::pin(async move { configure_pragmas_conn(conn, in_memory).await })
        });
    if in_memory {
        // The database lives only as long as a connection to it.
        pool_options = pool_options
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>);
    }
    let pool = pool_options.connect_with(options).await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully at {}", config.database_path);
    Ok(pool)
}

/// Create tables and indexes. Safe to run repeatedly.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    sqlx::query(&STUDENTS.create_table_sql())
        .execute(pool)
        .await?;
    for index in STUDENTS.indexes {
        sqlx::query(&index.create_sql()).execute(pool).await?;
    }

    info!("Migrations completed successfully");
    Ok(())
}

/// Configure SQLite pragmas on each new connection.
async fn configure_pragmas_conn(
    conn: &mut SqliteConnection,
    in_memory: bool,
) -> Result<(), sqlx::Error> {
    use sqlx::Row;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await?;

    if !in_memory {
        // journal_mode returns the actual mode set; must use fetch to get result
        let row = sqlx::query("PRAGMA journal_mode = WAL")
            .fetch_one(&mut *conn)
            .await?;
        let journal_mode: String = row.get(0);
        info!("SQLite journal_mode set to: {}", journal_mode);

        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&mut *conn)
            .await?;
    }

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&mut *conn)
        .await?;

    Ok(())
}

//! Repository: owns the connection pool and opens sessions.

use crate::db::session::Session;
use crate::error::StoreError;
use sqlx::sqlite::SqlitePool;

/// Entry point for database work.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Begin a new session on its own transaction.
    ///
    /// The session holds a pooled connection until it commits, rolls back or
    /// is dropped. With a single-connection pool, finish one session before
    /// beginning the next.
    pub async fn begin(&self) -> Result<Session, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Session::new(tx))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

//! The per-job unit of work.
//!
//! A [`Model`] owns one SQLite transaction. Every repository method is an
//! `impl Model` block in a sibling `*_repository.rs` file, and the job queue's
//! transactional operations run on the same connection, so a job's domain writes
//! and its completion commit or roll back together.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::infrastructure::ports::{ClockPort, RepoError};

pub struct Model {
    tx: Transaction<'static, Sqlite>,
    clock: Arc<dyn ClockPort>,
}

impl Model {
    pub async fn begin(pool: &SqlitePool, clock: Arc<dyn ClockPort>) -> Result<Self, RepoError> {
        let tx = pool
            .begin()
            .await
            .map_err(|e| RepoError::database("begin", e))?;
        Ok(Self { tx, clock })
    }

    /// Time as seen by this unit of work.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn clock(&self) -> Arc<dyn ClockPort> {
        Arc::clone(&self.clock)
    }

    pub(crate) fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    pub async fn commit(self) -> Result<(), RepoError> {
        self.tx
            .commit()
            .await
            .map_err(|e| RepoError::database("commit", e))
    }

    /// Dropping a `Model` also rolls back; this form reports failures.
    pub async fn rollback(self) -> Result<(), RepoError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| RepoError::database("rollback", e))
    }

    /// Take the write lock on one row before reading it.
    ///
    /// SQLite has no row locks. A no-op update is the first write of the
    /// transaction, which takes the database write lock; a competing job waits at
    /// most the busy timeout and then fails with [`RepoError::Busy`].
    pub(crate) async fn lock_row(
        &mut self,
        table: &'static str,
        entity_type: &'static str,
        id: uuid::Uuid,
    ) -> Result<(), RepoError> {
        let sql = format!("UPDATE {} SET updated_at = updated_at WHERE id = ?", table);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(self.conn())
            .await
            .map_err(|e| RepoError::database("lock_row", e))?;
        if result.rows_affected() == 0 {
            return Err(RepoError::not_found(entity_type, id));
        }
        Ok(())
    }
}

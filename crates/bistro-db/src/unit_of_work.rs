//! # Unit of Work
//!
//! One `UnitOfWork` is one SQLite transaction. Every engine operation that
//! writes more than one row runs inside exactly one of them, and every
//! mutating repository method takes `&mut UnitOfWork`, so a write outside a
//! transaction does not type-check.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  UnitOfWork::begin(pool)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock aggregate (table / bill / purchase order)   ◄── first statement  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  checks → writes (repositories, ledger)                                │
//! │       │                                                                 │
//! │       ├── Err(_) ──► UnitOfWork dropped ──► ROLLBACK                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  uow.commit()  ──► COMMIT                                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Aggregate locks
//! SQLite has no row locks. The first statement of each unit of work is a
//! no-op `UPDATE` of the aggregate row, which takes the database write lock
//! immediately (waiting up to `busy_timeout` for another writer). From then
//! on the transaction is the only writer, so reads of stock, bill totals and
//! round numbers cannot go stale before the transaction commits.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::trace;

use crate::error::{DbError, DbResult};

/// A database transaction that commits explicitly and rolls back on drop.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    /// Begins a new transaction on a pooled connection.
    pub async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let tx = pool.begin().await?;
        trace!("Unit of work started");
        Ok(UnitOfWork { tx })
    }

    /// The connection statements of this unit of work execute on.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    /// Runs an aggregate lock statement and reports whether the row exists.
    ///
    /// `sql` must be a single-row `UPDATE ... WHERE id = ?1` that changes
    /// nothing observable.
    pub(crate) async fn lock_row(&mut self, sql: &'static str, id: &str) -> DbResult<bool> {
        let result = sqlx::query(sql).bind(id).execute(self.conn()).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Commits every write made in this unit of work.
    pub async fn commit(self) -> DbResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        trace!("Unit of work committed");
        Ok(())
    }

    /// Discards every write made in this unit of work.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn count_units(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM units")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn insert_unit(uow: &mut UnitOfWork, name: &str) {
        sqlx::query("INSERT INTO units (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(name)
            .bind(chrono::Utc::now())
            .execute(uow.conn())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        {
            let mut uow = UnitOfWork::begin(db.pool()).await.unwrap();
            insert_unit(&mut uow, "bottle").await;
            // dropped without commit
        }

        assert_eq!(count_units(&db).await, 0);
    }

    #[tokio::test]
    async fn test_commit_persists() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut uow = UnitOfWork::begin(db.pool()).await.unwrap();
        insert_unit(&mut uow, "bottle").await;
        uow.commit().await.unwrap();

        assert_eq!(count_units(&db).await, 1);
    }

    #[tokio::test]
    async fn test_lock_row_reports_missing_rows() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut uow = UnitOfWork::begin(db.pool()).await.unwrap();

        let found = uow
            .lock_row("UPDATE units SET name = name WHERE id = ?1", "missing")
            .await
            .unwrap();
        assert!(!found);
        uow.rollback().await.unwrap();
    }
}

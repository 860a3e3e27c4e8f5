//! # Table Repository
//!
//! Dining tables. Status is only written through [`TableRepository::apply_event`],
//! inside the unit of work of the bill or reservation change that caused it.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use bistro_core::{CoreError, DiningTable, NewDiningTable, TableEvent, TableStatus};

use super::new_id;
use crate::error::{DbError, DbResult};
use crate::unit_of_work::UnitOfWork;

#[derive(Debug, Clone)]
pub struct TableRepository {
    pool: SqlitePool,
}

impl TableRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TableRepository { pool }
    }

    /// Creates a free table. Duplicate numbers fail with `Conflict`.
    pub async fn create(&self, input: &NewDiningTable) -> DbResult<DiningTable> {
        if input.number <= 0 || input.seats <= 0 {
            return Err(CoreError::invalid("table number and seats must be positive").into());
        }

        let now = Utc::now();
        let table = DiningTable {
            id: new_id(),
            number: input.number,
            seats: input.seats,
            status: TableStatus::Free,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO dining_tables (id, number, seats, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(&table.id)
        .bind(table.number)
        .bind(table.seats)
        .bind(table.status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(table_id = %table.id, number = table.number, "Table created");
        Ok(table)
    }

    pub async fn get(&self, table_id: &str) -> DbResult<DiningTable> {
        let mut conn = self.pool.acquire().await?;
        fetch_table(&mut conn, table_id)
            .await?
            .ok_or_else(|| DbError::not_found("Table", table_id))
    }

    pub async fn list(&self) -> DbResult<Vec<DiningTable>> {
        let tables = sqlx::query_as::<_, DiningTable>(
            "SELECT id, number, seats, status, created_at, updated_at FROM dining_tables ORDER BY number",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }

    /// Takes the write lock on a table and returns its current row.
    pub(crate) async fn lock_table(&self, uow: &mut UnitOfWork, table_id: &str) -> DbResult<DiningTable> {
        if !uow
            .lock_row("UPDATE dining_tables SET id = id WHERE id = ?1", table_id)
            .await?
        {
            return Err(DbError::not_found("Table", table_id));
        }

        fetch_table(uow.conn(), table_id)
            .await?
            .ok_or_else(|| DbError::not_found("Table", table_id))
    }

    /// Moves a table along the status tracker and persists the result.
    pub(crate) async fn apply_event(
        &self,
        uow: &mut UnitOfWork,
        table_id: &str,
        event: TableEvent,
    ) -> DbResult<TableStatus> {
        let current: TableStatus =
            sqlx::query_scalar("SELECT status FROM dining_tables WHERE id = ?1")
                .bind(table_id)
                .fetch_optional(uow.conn())
                .await?
                .ok_or_else(|| DbError::not_found("Table", table_id))?;

        let next = current.apply(table_id, event)?;

        if next != current {
            sqlx::query("UPDATE dining_tables SET status = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(table_id)
                .bind(next)
                .bind(Utc::now())
                .execute(uow.conn())
                .await?;
            debug!(table_id = %table_id, from = %current, to = %next, ?event, "Table status changed");
        }

        Ok(next)
    }
}

async fn fetch_table(conn: &mut SqliteConnection, table_id: &str) -> DbResult<Option<DiningTable>> {
    let table = sqlx::query_as::<_, DiningTable>(
        "SELECT id, number, seats, status, created_at, updated_at FROM dining_tables WHERE id = ?1",
    )
    .bind(table_id)
    .fetch_optional(conn)
    .await?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use bistro_core::ErrorKind;

    #[tokio::test]
    async fn test_table_numbers_are_unique() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tables = db.tables();

        let five = tables.create(&NewDiningTable { number: 5, seats: 4 }).await.unwrap();
        assert_eq!(five.status, TableStatus::Free);

        let err = tables
            .create(&NewDiningTable { number: 5, seats: 2 })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        assert_eq!(tables.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_apply_event_persists_status() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tables = db.tables();
        let table = tables.create(&NewDiningTable { number: 1, seats: 2 }).await.unwrap();

        let mut uow = UnitOfWork::begin(db.pool()).await.unwrap();
        tables.lock_table(&mut uow, &table.id).await.unwrap();
        let status = tables
            .apply_event(&mut uow, &table.id, TableEvent::Reserved)
            .await
            .unwrap();
        assert_eq!(status, TableStatus::Reserved);

        let err = tables
            .apply_event(&mut uow, &table.id, TableEvent::Reserved)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TableUnavailable);
        uow.commit().await.unwrap();

        assert_eq!(tables.get(&table.id).await.unwrap().status, TableStatus::Reserved);
    }
}

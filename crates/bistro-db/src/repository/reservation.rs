//! # Reservation Repository

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use bistro_core::{Reservation, ReservationStatus};

use super::new_id;
use crate::error::{DbError, DbResult};
use crate::unit_of_work::UnitOfWork;

const RESERVATION_COLUMNS: &str =
    "id, customer_id, table_id, reserved_for, party_size, status, note, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Reservation> {
        let mut conn = self.pool.acquire().await?;
        fetch_reservation(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Reservation", id))
    }

    /// Reservations for one table, soonest first.
    pub async fn list_for_table(&self, table_id: &str) -> DbResult<Vec<Reservation>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE table_id = ?1 ORDER BY reserved_for"
        );
        let reservations = sqlx::query_as::<_, Reservation>(&sql)
            .bind(table_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(reservations)
    }

    pub async fn list(&self, status: Option<ReservationStatus>) -> DbResult<Vec<Reservation>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE ?1 IS NULL OR status = ?1 ORDER BY reserved_for"
        );
        let reservations = sqlx::query_as::<_, Reservation>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        Ok(reservations)
    }

    pub(crate) async fn insert(
        &self,
        uow: &mut UnitOfWork,
        customer_id: &str,
        table_id: &str,
        reserved_for: chrono::DateTime<Utc>,
        party_size: i64,
        note: Option<&str>,
    ) -> DbResult<Reservation> {
        let now = Utc::now();
        let reservation = Reservation {
            id: new_id(),
            customer_id: customer_id.to_string(),
            table_id: table_id.to_string(),
            reserved_for,
            party_size,
            status: ReservationStatus::Confirmed,
            note: note.map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO reservations (id, customer_id, table_id, reserved_for, party_size, status, note, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
        )
        .bind(&reservation.id)
        .bind(&reservation.customer_id)
        .bind(&reservation.table_id)
        .bind(reservation.reserved_for)
        .bind(reservation.party_size)
        .bind(reservation.status)
        .bind(&reservation.note)
        .bind(now)
        .execute(uow.conn())
        .await?;

        Ok(reservation)
    }

    /// Takes the write lock on a reservation and returns its current row.
    pub(crate) async fn lock(&self, uow: &mut UnitOfWork, id: &str) -> DbResult<Reservation> {
        if !uow
            .lock_row("UPDATE reservations SET id = id WHERE id = ?1", id)
            .await?
        {
            return Err(DbError::not_found("Reservation", id));
        }

        fetch_reservation(uow.conn(), id)
            .await?
            .ok_or_else(|| DbError::not_found("Reservation", id))
    }

    pub(crate) async fn set_status(
        &self,
        uow: &mut UnitOfWork,
        id: &str,
        status: ReservationStatus,
    ) -> DbResult<Reservation> {
        sqlx::query("UPDATE reservations SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(Utc::now())
            .execute(uow.conn())
            .await?;

        fetch_reservation(uow.conn(), id)
            .await?
            .ok_or_else(|| DbError::not_found("Reservation", id))
    }

    /// Marks every reservation still holding `table_id` as seated.
    pub(crate) async fn seat_for_table(&self, uow: &mut UnitOfWork, table_id: &str) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'seated', updated_at = ?2
            WHERE table_id = ?1 AND status IN ('pending', 'confirmed')
            "#,
        )
        .bind(table_id)
        .bind(Utc::now())
        .execute(uow.conn())
        .await?;
        Ok(result.rows_affected())
    }

    /// Number of pending or confirmed reservations on `table_id`.
    pub(crate) async fn holders_in(&self, uow: &mut UnitOfWork, table_id: &str) -> DbResult<i64> {
        let holders: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations WHERE table_id = ?1 AND status IN ('pending', 'confirmed')",
        )
        .bind(table_id)
        .fetch_one(uow.conn())
        .await?;
        Ok(holders)
    }
}

async fn fetch_reservation(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Reservation>> {
    let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = ?1");
    let reservation = sqlx::query_as::<_, Reservation>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(reservation)
}

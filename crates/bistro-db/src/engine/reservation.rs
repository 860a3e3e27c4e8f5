//! # Reservation Engine
//!
//! Reservations hold a free table for a customer. The table moves to
//! `reserved` in the same unit of work that writes the reservation, and back
//! to `free` when a reservation is cancelled before the guests sit down.
//! Placing the party's first round marks the reservation `seated`, so it no
//! longer holds the table after checkout.

use sqlx::SqlitePool;
use tracing::{info, warn};

use bistro_core::validation::validate_reservation;
use bistro_core::{CreateReservationRequest, Reservation, ReservationStatus, TableEvent};

use crate::error::DbResult;
use crate::repository::directory::DirectoryRepository;
use crate::repository::reservation::ReservationRepository;
use crate::repository::table::TableRepository;
use crate::unit_of_work::UnitOfWork;

#[derive(Debug, Clone)]
pub struct ReservationEngine {
    pool: SqlitePool,
    reservations: ReservationRepository,
    directory: DirectoryRepository,
    tables: TableRepository,
}

impl ReservationEngine {
    pub fn new(pool: SqlitePool) -> Self {
        ReservationEngine {
            reservations: ReservationRepository::new(pool.clone()),
            directory: DirectoryRepository::new(pool.clone()),
            tables: TableRepository::new(pool.clone()),
            pool,
        }
    }

    /// Books a free table. The customer is matched by phone or created.
    ///
    /// Fails with `TableUnavailable` when the table is reserved or occupied.
    pub async fn create_reservation(
        &self,
        request: &CreateReservationRequest,
    ) -> DbResult<Reservation> {
        validate_reservation(request)?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        self.tables.lock_table(&mut uow, &request.table_id).await?;
        self.tables
            .apply_event(&mut uow, &request.table_id, TableEvent::Reserved)
            .await
            .inspect_err(|e| {
                warn!(table_id = %request.table_id, error = %e, "Reservation refused");
            })?;

        let customer = self
            .directory
            .find_or_create_customer(&mut uow, &request.customer)
            .await?;
        let reservation = self
            .reservations
            .insert(
                &mut uow,
                &customer.id,
                &request.table_id,
                request.reserved_for,
                request.party_size,
                request.note.as_deref(),
            )
            .await?;
        uow.commit().await?;

        info!(
            reservation_id = %reservation.id,
            table_id = %reservation.table_id,
            customer_id = %customer.id,
            reserved_for = %reservation.reserved_for,
            "Reservation created"
        );
        Ok(reservation)
    }

    /// Moves a reservation to `status` by wire name.
    pub async fn update_reservation_status(
        &self,
        reservation_id: &str,
        status: &str,
    ) -> DbResult<Reservation> {
        let status: ReservationStatus = status.parse()?;
        self.set_reservation_status(reservation_id, status).await
    }

    /// Cancelling frees the table if it is still only reserved and no other
    /// reservation holds it. Seated reservations cannot change.
    pub async fn set_reservation_status(
        &self,
        reservation_id: &str,
        status: ReservationStatus,
    ) -> DbResult<Reservation> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let current = self.reservations.lock(&mut uow, reservation_id).await?;
        let next = current.status.transition(status)?;
        if next == current.status {
            uow.rollback().await?;
            return Ok(current);
        }

        let updated = self
            .reservations
            .set_status(&mut uow, reservation_id, next)
            .await?;
        // The table is freed only once nothing else holds it.
        if next == ReservationStatus::Cancelled
            && self.reservations.holders_in(&mut uow, &current.table_id).await? == 0
        {
            self.tables
                .apply_event(&mut uow, &current.table_id, TableEvent::ReservationCancelled)
                .await?;
        }
        uow.commit().await?;

        info!(reservation_id = %reservation_id, from = %current.status, to = %next, "Reservation status changed");
        Ok(updated)
    }

    pub async fn get_reservation(&self, reservation_id: &str) -> DbResult<Reservation> {
        self.reservations.get(reservation_id).await
    }

    pub async fn list_reservations(
        &self,
        status: Option<ReservationStatus>,
    ) -> DbResult<Vec<Reservation>> {
        self.reservations.list(status).await
    }

    pub async fn reservations_for_table(&self, table_id: &str) -> DbResult<Vec<Reservation>> {
        self.reservations.list_for_table(table_id).await
    }
}

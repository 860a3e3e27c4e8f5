//! # Tables & Reservations
//!
//! ## Table Status Tracker
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │              Reserved event                                             │
//! │   FREE ───────────────────────────► RESERVED                            │
//! │    ▲ ▲                                │                                 │
//! │    │ │  ReservationCancelled          │ RoundAdded                      │
//! │    │ └────────────────────────────────┤                                 │
//! │    │                                  ▼                                 │
//! │    │          BillClosed          OCCUPIED ◄── RoundAdded (from FREE)  │
//! │    └──────────────────────────────────┘                                 │
//! │                                                                         │
//! │  Reserving a table that is not FREE fails with TableUnavailable.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Table status is written only by the engines, inside the same unit of work
//! as the bill or reservation change that triggered it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::NewCustomer;

// =============================================================================
// Table Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    #[default]
    Free,
    Reserved,
    Occupied,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Free => "free",
            TableStatus::Reserved => "reserved",
            TableStatus::Occupied => "occupied",
        }
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle events that move a table between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableEvent {
    /// A reservation was created for the table.
    Reserved,
    /// A round was added to the table's bill.
    RoundAdded,
    /// The table's bill was paid or cancelled.
    BillClosed,
    /// The reservation holding the table was cancelled.
    ReservationCancelled,
}

impl TableStatus {
    /// Next status of `table_id` after `event`.
    pub fn apply(self, table_id: &str, event: TableEvent) -> CoreResult<TableStatus> {
        match (self, event) {
            (TableStatus::Free, TableEvent::Reserved) => Ok(TableStatus::Reserved),
            (status, TableEvent::Reserved) => Err(CoreError::TableUnavailable {
                table_id: table_id.to_string(),
                status: status.to_string(),
            }),
            (_, TableEvent::RoundAdded) => Ok(TableStatus::Occupied),
            (_, TableEvent::BillClosed) => Ok(TableStatus::Free),
            // Guests already seated keep the table occupied.
            (TableStatus::Reserved, TableEvent::ReservationCancelled) => Ok(TableStatus::Free),
            (status, TableEvent::ReservationCancelled) => Ok(status),
        }
    }
}

// =============================================================================
// Dining Table
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DiningTable {
    pub id: String,
    /// Number painted on the table; unique.
    pub number: i64,
    pub seats: i64,
    pub status: TableStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewDiningTable {
    pub number: i64,
    pub seats: i64,
}

// =============================================================================
// Reservations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    #[default]
    Pending,
    Confirmed,
    /// The party sat down and ordered; the reservation no longer holds the table.
    Seated,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Seated => "seated",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    /// Whether a reservation in this status keeps its table reserved.
    pub fn holds_table(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }

    /// Checks a status change requested by staff.
    ///
    /// Seated and cancelled are terminal. Seating happens only when the
    /// party's first round is placed, never by request.
    pub fn transition(self, to: ReservationStatus) -> CoreResult<ReservationStatus> {
        if self == to {
            return Ok(to);
        }
        match (self, to) {
            (ReservationStatus::Cancelled | ReservationStatus::Seated, _)
            | (_, ReservationStatus::Pending | ReservationStatus::Seated) => {
                Err(CoreError::InvalidTransition {
                    entity: "Reservation".to_string(),
                    from: self.to_string(),
                    to: to.to_string(),
                })
            }
            _ => Ok(to),
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ReservationStatus::Pending),
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "seated" => Ok(ReservationStatus::Seated),
            "cancelled" | "canceled" => Ok(ReservationStatus::Cancelled),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec![
                    "pending".into(),
                    "confirmed".into(),
                    "seated".into(),
                    "cancelled".into(),
                ],
            }
            .into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Reservation {
    pub id: String,
    pub customer_id: String,
    pub table_id: String,
    #[ts(as = "String")]
    pub reserved_for: DateTime<Utc>,
    pub party_size: i64,
    pub status: ReservationStatus,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input of `create_reservation`. The customer is matched by phone.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateReservationRequest {
    pub customer: NewCustomer,
    pub table_id: String,
    #[ts(as = "String")]
    pub reserved_for: DateTime<Utc>,
    pub party_size: i64,
    pub note: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

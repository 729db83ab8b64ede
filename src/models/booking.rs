//! Bookings and the status state machine that drives vehicle availability.

use crate::models::{user::UserId, vehicle::VehicleId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};

pub type BookingId = i64;

/// Booking lifecycle: `pending -> confirmed -> active -> completed`, with
/// `cancelled` reachable from any non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Active,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Statuses that keep a vehicle under obligation.
    pub fn holds_vehicle(self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::Active
        )
    }

    /// Availability the referenced vehicle takes when a booking enters this
    /// status. Depends only on the target status, never on the previous one.
    pub fn availability_effect(self) -> Option<bool> {
        match self {
            BookingStatus::Confirmed | BookingStatus::Active => Some(false),
            BookingStatus::Completed | BookingStatus::Cancelled => Some(true),
            BookingStatus::Pending => None,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "Invalid status value. Must be one of: pending, confirmed, active, completed, cancelled"
)]
pub struct UnknownStatus(pub String);

impl FromStr for BookingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// A reservation of one vehicle by one requester.
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: BookingId,

    /// Human-facing identifier, e.g. `BK-2024-0042`.
    pub booking_number: String,

    /// Requester identity. Ownership checks use this, not the email.
    pub user_id: UserId,
    pub vehicle_id: VehicleId,

    // Snapshots taken at creation time.
    pub customer_name: String,
    pub customer_email: String,
    pub vehicle_name: String,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: i64,
    pub price_per_day: Decimal,
    pub total_amount: Decimal,

    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

/// Raw `bookings` row; money columns are stored as decimal text.
#[derive(FromRow, Debug)]
pub(crate) struct BookingRow {
    pub id: i64,
    pub booking_number: String,
    pub user_id: i64,
    pub vehicle_id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub vehicle_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: i64,
    pub price_per_day: String,
    pub total_amount: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = sqlx::Error;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let price_per_day =
            Decimal::from_str(&row.price_per_day).map_err(|e| sqlx::Error::Decode(e.into()))?;
        let total_amount =
            Decimal::from_str(&row.total_amount).map_err(|e| sqlx::Error::Decode(e.into()))?;

        Ok(Booking {
            id: row.id,
            booking_number: row.booking_number,
            user_id: row.user_id,
            vehicle_id: row.vehicle_id,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            vehicle_name: row.vehicle_name,
            start_date: row.start_date,
            end_date: row.end_date,
            total_days: row.total_days,
            price_per_day,
            total_amount,
            status: row.status,
            created_at: row.created_at,
        })
    }
}

/// Customer request to reserve a vehicle.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub vehicle_id: VehicleId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Whole calendar days between two dates. Negative when `end` precedes `start`.
pub fn rental_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

//! LedgerService: bookings, pricing and the status state machine.
//!
//! Every write that touches both a booking and its vehicle runs in one SQLite
//! transaction, so a status change and its availability side effect commit
//! together.

use crate::{
    access::{self, AccessDenied, Policy},
    db::is_unique_violation,
    models::{
        booking::{
            Booking, BookingId, BookingRow, BookingStatus, NewBooking, UnknownStatus, rental_days,
        },
        user::Identity,
        vehicle::VehicleId,
    },
    services::catalog_service::{fetch_vehicle, write_availability},
};
use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, SqliteConnection, SqlitePool, sqlite::Sqlite};
use std::{fmt, sync::Arc};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("booking `{0}` not found")]
    BookingNotFound(BookingId),
    #[error("vehicle `{0}` not found")]
    VehicleNotFound(VehicleId),
    #[error("Vehicle is not available")]
    VehicleUnavailable(VehicleId),
    #[error("End date must be after start date")]
    InvalidDates,
    #[error("Booking total is out of range")]
    AmountOutOfRange,
    #[error(transparent)]
    InvalidStatus(#[from] UnknownStatus),
    #[error("Booking is already cancelled")]
    AlreadyCancelled(BookingId),
    #[error("Cannot cancel completed booking")]
    AlreadyCompleted(BookingId),
    #[error("Booking number {0} is already taken, please retry")]
    BookingNumberTaken(String),
    #[error(transparent)]
    Denied(#[from] AccessDenied),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

const BOOKING_COLUMNS: &str = "id, booking_number, user_id, vehicle_id, customer_name, \
     customer_email, vehicle_name, start_date, end_date, total_days, price_per_day, \
     total_amount, status, created_at";

/// Produces booking numbers `BK-<year>-<0000..9999>`.
///
/// On collision with an existing number the generator falls back once to
/// `BK-<year>-<epoch seconds>` instead of drawing again.
#[derive(Clone)]
pub struct BookingNumbers {
    suffix: Arc<dyn Fn() -> u16 + Send + Sync>,
}

impl BookingNumbers {
    pub fn random() -> Self {
        Self::with_suffix_source(|| rand::thread_rng().gen_range(0..=9999))
    }

    /// Use a custom source for the 4-digit suffix. Values above 9999 wrap.
    pub fn with_suffix_source(source: impl Fn() -> u16 + Send + Sync + 'static) -> Self {
        Self {
            suffix: Arc::new(source),
        }
    }

    fn primary(&self, now: DateTime<Utc>) -> String {
        format!("BK-{}-{:04}", now.year(), (self.suffix)() % 10_000)
    }

    fn fallback(now: DateTime<Utc>) -> String {
        format!("BK-{}-{}", now.year(), now.timestamp())
    }

    async fn next(&self, conn: &mut SqliteConnection, now: DateTime<Utc>) -> LedgerResult<String> {
        let candidate = self.primary(now);
        let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM bookings WHERE booking_number = ?")
            .bind(&candidate)
            .fetch_optional(&mut *conn)
            .await?;

        if taken.is_some() {
            let fallback = Self::fallback(now);
            warn!("booking number {} taken, falling back to {}", candidate, fallback);
            return Ok(fallback);
        }
        Ok(candidate)
    }
}

impl Default for BookingNumbers {
    fn default() -> Self {
        Self::random()
    }
}

impl fmt::Debug for BookingNumbers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookingNumbers").finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct LedgerService {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
    numbers: BookingNumbers,
}

impl LedgerService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self::with_numbers(db, BookingNumbers::random())
    }

    pub fn with_numbers(db: Arc<SqlitePool>, numbers: BookingNumbers) -> Self {
        Self { db, numbers }
    }

    /// Reserve a vehicle for `requester`.
    ///
    /// The booking starts `pending` and does not touch the vehicle's
    /// availability. Overlapping pending bookings on one vehicle are accepted.
    pub async fn create_booking(&self, requester: &Identity, new: NewBooking) -> LedgerResult<Booking> {
        access::authorize(Some(requester), Policy::Authenticated)?;

        let mut tx = self.db.begin().await?;

        let vehicle = fetch_vehicle(&mut tx, new.vehicle_id)
            .await?
            .ok_or(LedgerError::VehicleNotFound(new.vehicle_id))?;
        if !vehicle.available {
            return Err(LedgerError::VehicleUnavailable(vehicle.id));
        }

        let total_days = rental_days(new.start_date, new.end_date);
        if total_days <= 0 {
            return Err(LedgerError::InvalidDates);
        }
        let price_per_day = vehicle.price_per_day;
        let total_amount = price_per_day
            .checked_mul(Decimal::from(total_days))
            .ok_or(LedgerError::AmountOutOfRange)?;

        let now = Utc::now();
        let booking_number = self.numbers.next(&mut tx, now).await?;

        let inserted = sqlx::query_as::<_, BookingRow>(&format!(
            "INSERT INTO bookings (booking_number, user_id, vehicle_id, customer_name,
                customer_email, vehicle_name, start_date, end_date, total_days, price_per_day,
                total_amount, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(&booking_number)
        .bind(requester.id)
        .bind(vehicle.id)
        .bind(&requester.name)
        .bind(&requester.email)
        .bind(&vehicle.name)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(total_days)
        .bind(price_per_day.normalize().to_string())
        .bind(total_amount.normalize().to_string())
        .bind(BookingStatus::Pending)
        .bind(now)
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(err) if is_unique_violation(&err) => {
                return Err(LedgerError::BookingNumberTaken(booking_number));
            }
            Err(err) => return Err(err.into()),
        };
        tx.commit().await?;

        let booking = Booking::try_from(row)?;
        info!(
            booking_id = booking.id,
            vehicle_id = booking.vehicle_id,
            user_id = booking.user_id,
            "created booking {}",
            booking.booking_number
        );
        Ok(booking)
    }

    /// Admin-only status change.
    ///
    /// Any edge is accepted; the vehicle side effect is chosen by the target
    /// status alone and re-applied even when the status does not change.
    pub async fn update_status(
        &self,
        id: BookingId,
        status: &str,
        actor: &Identity,
    ) -> LedgerResult<Booking> {
        access::authorize(Some(actor), Policy::AdminOnly)?;
        let status: BookingStatus = status.parse()?;

        let mut tx = self.db.begin().await?;
        let booking = fetch_booking(&mut tx, id)
            .await?
            .ok_or(LedgerError::BookingNotFound(id))?;

        let updated = transition(&mut tx, &booking, status).await?;
        tx.commit().await?;

        info!(
            booking_id = id,
            from = %booking.status,
            to = %status,
            actor = actor.id,
            "booking status updated"
        );
        Ok(updated)
    }

    /// Cancel a booking as its requester or an admin.
    ///
    /// Not idempotent: cancelling a cancelled or completed booking fails.
    pub async fn cancel(&self, id: BookingId, actor: &Identity) -> LedgerResult<Booking> {
        let mut tx = self.db.begin().await?;
        let booking = fetch_booking(&mut tx, id)
            .await?
            .ok_or(LedgerError::BookingNotFound(id))?;

        access::authorize(Some(actor), Policy::AdminOrOwner(booking.user_id))?;

        match booking.status {
            BookingStatus::Cancelled => return Err(LedgerError::AlreadyCancelled(id)),
            BookingStatus::Completed => return Err(LedgerError::AlreadyCompleted(id)),
            _ => {}
        }

        let cancelled = transition(&mut tx, &booking, BookingStatus::Cancelled).await?;
        tx.commit().await?;

        info!(booking_id = id, actor = actor.id, "booking cancelled");
        Ok(cancelled)
    }

    /// Bookings visible to `actor`, newest first.
    ///
    /// Admins see every booking, customers only their own. `"all"` or `None`
    /// disables the status filter.
    pub async fn list(&self, actor: &Identity, status: Option<&str>) -> LedgerResult<Vec<Booking>> {
        access::authorize(Some(actor), Policy::Authenticated)?;

        let status = match status.map(str::trim).filter(|s| !s.is_empty() && *s != "all") {
            Some(s) => Some(s.parse::<BookingStatus>()?),
            None => None,
        };

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT ");
        builder.push(BOOKING_COLUMNS);
        builder.push(" FROM bookings WHERE 1 = 1");

        if !actor.is_admin() {
            builder.push(" AND user_id = ");
            builder.push_bind(actor.id);
        }
        if let Some(status) = status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        let rows: Vec<BookingRow> = builder.build_query_as().fetch_all(&*self.db).await?;
        rows.into_iter()
            .map(|row| Booking::try_from(row).map_err(LedgerError::from))
            .collect()
    }

    /// One booking, visible to an admin or its requester.
    pub async fn get(&self, id: BookingId, actor: &Identity) -> LedgerResult<Booking> {
        let mut conn = self.db.acquire().await?;
        let booking = fetch_booking(&mut conn, id)
            .await?
            .ok_or(LedgerError::BookingNotFound(id))?;

        access::authorize(Some(actor), Policy::AdminOrOwner(booking.user_id))?;
        Ok(booking)
    }
}

async fn fetch_booking(
    conn: &mut SqliteConnection,
    id: BookingId,
) -> Result<Option<Booking>, sqlx::Error> {
    let row = sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Booking::try_from).transpose()
}

/// Write `status` and apply its vehicle availability side effect.
async fn transition(
    conn: &mut SqliteConnection,
    booking: &Booking,
    status: BookingStatus,
) -> LedgerResult<Booking> {
    let row = sqlx::query_as::<_, BookingRow>(&format!(
        "UPDATE bookings SET status = ? WHERE id = ? RETURNING {BOOKING_COLUMNS}"
    ))
    .bind(status)
    .bind(booking.id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(LedgerError::BookingNotFound(booking.id))?;

    if let Some(available) = status.availability_effect() {
        if write_availability(conn, booking.vehicle_id, available).await? == 0 {
            // The vehicle row may have been removed after the booking reached
            // a terminal status; the booking still transitions.
            warn!(
                booking_id = booking.id,
                vehicle_id = booking.vehicle_id,
                "vehicle missing while applying availability"
            );
        }
    }

    Ok(Booking::try_from(row)?)
}

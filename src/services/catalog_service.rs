//! CatalogService: the vehicle fleet backed by SQLite.
//!
//! Owns vehicle records and the availability flag. The flag is only flipped
//! from outside through [`CatalogService::set_availability`] or, inside a
//! ledger transaction, through [`write_availability`].

use crate::models::{
    booking::BookingStatus,
    vehicle::{
        NewVehicle, PLACEHOLDER_IMAGE, Vehicle, VehicleFilter, VehicleId, VehiclePatch, VehicleRow,
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, SqliteConnection, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("vehicle `{0}` not found")]
    VehicleNotFound(VehicleId),
    #[error("{0}")]
    Invalid(String),
    #[error("No fields to update")]
    NothingToUpdate,
    #[error("vehicle `{0}` has pending, confirmed or active bookings")]
    HasActiveBookings(VehicleId),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

pub(crate) const VEHICLE_COLUMNS: &str = "id, name, brand, category, price_per_day, image, seats, \
     transmission, fuel, available, description, year, mileage, features, created_at";

#[derive(Clone)]
pub struct CatalogService {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl CatalogService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// List vehicles matching `filter`, newest first. No pagination.
    pub async fn list_vehicles(&self, filter: &VehicleFilter) -> CatalogResult<Vec<Vehicle>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT ");
        builder.push(VEHICLE_COLUMNS);
        builder.push(" FROM vehicles WHERE 1 = 1");

        if let Some(category) = filter
            .category
            .as_deref()
            .filter(|c| !c.is_empty() && *c != "all")
        {
            builder.push(" AND category = ");
            builder.push_bind(category.to_string());
        }

        if let Some(available) = filter.available {
            builder.push(" AND available = ");
            builder.push_bind(available);
        }

        builder.push(" ORDER BY created_at DESC, id DESC");

        let rows: Vec<VehicleRow> = builder.build_query_as().fetch_all(&*self.db).await?;
        let mut vehicles = rows
            .into_iter()
            .map(Vehicle::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        // SQLite's LOWER() only folds ASCII, so the search runs here.
        if let Some(needle) = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
        {
            vehicles.retain(|v| {
                v.name.to_lowercase().contains(&needle) || v.brand.to_lowercase().contains(&needle)
            });
        }

        debug!("listed {} vehicles", vehicles.len());
        Ok(vehicles)
    }

    pub async fn get_vehicle(&self, id: VehicleId) -> CatalogResult<Vehicle> {
        let mut conn = self.db.acquire().await?;
        fetch_vehicle(&mut conn, id)
            .await?
            .ok_or(CatalogError::VehicleNotFound(id))
    }

    /// Insert a vehicle after checking its invariants.
    ///
    /// Defaults: image `/placeholder.svg`, available, no features.
    pub async fn create_vehicle(&self, new: NewVehicle) -> CatalogResult<Vehicle> {
        ensure_text("name", &new.name)?;
        ensure_text("brand", &new.brand)?;
        ensure_text("category", &new.category)?;
        ensure_text("fuel", &new.fuel)?;
        ensure_price(new.price_per_day)?;
        ensure_seats(new.seats)?;

        let features = serde_json::to_string(&new.features)
            .map_err(|e| CatalogError::Invalid(format!("invalid features: {e}")))?;

        let row = sqlx::query_as::<_, VehicleRow>(&format!(
            "INSERT INTO vehicles (name, brand, category, price_per_day, image, seats,
                transmission, fuel, available, description, year, mileage, features, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {VEHICLE_COLUMNS}"
        ))
        .bind(new.name.trim())
        .bind(new.brand.trim())
        .bind(new.category.trim())
        .bind(new.price_per_day.normalize().to_string())
        .bind(new.image.unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()))
        .bind(new.seats)
        .bind(new.transmission.as_str())
        .bind(new.fuel.trim())
        .bind(new.available.unwrap_or(true))
        .bind(new.description)
        .bind(new.year)
        .bind(new.mileage)
        .bind(features)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?;

        let vehicle = Vehicle::try_from(row)?;
        info!(vehicle_id = vehicle.id, "created vehicle {}", vehicle.name);
        Ok(vehicle)
    }

    /// Sparse update: only the fields present in `patch` are written.
    pub async fn update_vehicle(&self, id: VehicleId, patch: VehiclePatch) -> CatalogResult<Vehicle> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM vehicles WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.db)
            .await?;
        if exists.is_none() {
            return Err(CatalogError::VehicleNotFound(id));
        }
        if patch.is_empty() {
            return Err(CatalogError::NothingToUpdate);
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE vehicles SET ");
        let mut set = builder.separated(", ");

        if let Some(name) = patch.name {
            ensure_text("name", &name)?;
            set.push("name = ").push_bind_unseparated(name.trim().to_string());
        }
        if let Some(brand) = patch.brand {
            ensure_text("brand", &brand)?;
            set.push("brand = ").push_bind_unseparated(brand.trim().to_string());
        }
        if let Some(category) = patch.category {
            ensure_text("category", &category)?;
            set.push("category = ").push_bind_unseparated(category.trim().to_string());
        }
        if let Some(price) = patch.price_per_day {
            ensure_price(price)?;
            set.push("price_per_day = ").push_bind_unseparated(price.normalize().to_string());
        }
        if let Some(image) = patch.image {
            set.push("image = ").push_bind_unseparated(image);
        }
        if let Some(seats) = patch.seats {
            ensure_seats(seats)?;
            set.push("seats = ").push_bind_unseparated(seats);
        }
        if let Some(transmission) = patch.transmission {
            set.push("transmission = ").push_bind_unseparated(transmission.as_str());
        }
        if let Some(fuel) = patch.fuel {
            ensure_text("fuel", &fuel)?;
            set.push("fuel = ").push_bind_unseparated(fuel.trim().to_string());
        }
        if let Some(available) = patch.available {
            set.push("available = ").push_bind_unseparated(available);
        }
        if let Some(description) = patch.description {
            set.push("description = ").push_bind_unseparated(description);
        }
        if let Some(year) = patch.year {
            set.push("year = ").push_bind_unseparated(year);
        }
        if let Some(mileage) = patch.mileage {
            set.push("mileage = ").push_bind_unseparated(mileage);
        }
        if let Some(features) = patch.features {
            let encoded = serde_json::to_string(&features)
                .map_err(|e| CatalogError::Invalid(format!("invalid features: {e}")))?;
            set.push("features = ").push_bind_unseparated(encoded);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING ");
        builder.push(VEHICLE_COLUMNS);

        let row: VehicleRow = builder
            .build_query_as()
            .fetch_optional(&*self.db)
            .await?
            .ok_or(CatalogError::VehicleNotFound(id))?;

        info!(vehicle_id = id, "updated vehicle");
        Ok(Vehicle::try_from(row)?)
    }

    /// Delete a vehicle that has no booking under obligation.
    pub async fn delete_vehicle(&self, id: VehicleId) -> CatalogResult<()> {
        let mut tx = self.db.begin().await?;

        if fetch_vehicle(&mut tx, id).await?.is_none() {
            return Err(CatalogError::VehicleNotFound(id));
        }

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM bookings WHERE vehicle_id = ");
        count.push_bind(id);
        count.push(" AND status IN (");
        let mut statuses = count.separated(", ");
        for status in BookingStatus::ALL.into_iter().filter(|s| s.holds_vehicle()) {
            statuses.push_bind(status);
        }
        count.push(")");

        let holding: i64 = count.build_query_scalar().fetch_one(&mut *tx).await?;

        if holding > 0 {
            return Err(CatalogError::HasActiveBookings(id));
        }

        sqlx::query("DELETE FROM vehicles WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(vehicle_id = id, "deleted vehicle");
        Ok(())
    }

    /// Set the availability flag outside of any ledger transaction.
    pub async fn set_availability(&self, id: VehicleId, available: bool) -> CatalogResult<()> {
        let mut conn = self.db.acquire().await?;
        if write_availability(&mut conn, id, available).await? == 0 {
            return Err(CatalogError::VehicleNotFound(id));
        }
        Ok(())
    }
}

/// Load one vehicle on an existing connection or transaction.
pub(crate) async fn fetch_vehicle(
    conn: &mut SqliteConnection,
    id: VehicleId,
) -> Result<Option<Vehicle>, sqlx::Error> {
    let row = sqlx::query_as::<_, VehicleRow>(&format!(
        "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Vehicle::try_from).transpose()
}

/// Write the availability flag; returns the number of rows touched.
pub(crate) async fn write_availability(
    conn: &mut SqliteConnection,
    id: VehicleId,
    available: bool,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE vehicles SET available = ? WHERE id = ?")
        .bind(available)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    debug!(vehicle_id = id, available, "availability written");
    Ok(result.rows_affected())
}

fn ensure_text(field: &str, value: &str) -> CatalogResult<()> {
    if value.trim().is_empty() {
        return Err(CatalogError::Invalid(format!("Field '{field}' is required")));
    }
    Ok(())
}

/// Upper bound on a daily rate.
pub const MAX_PRICE_PER_DAY: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

fn ensure_price(price: Decimal) -> CatalogResult<()> {
    if price <= Decimal::ZERO {
        return Err(CatalogError::Invalid(
            "Price per day must be greater than 0".into(),
        ));
    }
    if price > MAX_PRICE_PER_DAY {
        return Err(CatalogError::Invalid(format!(
            "Price per day must not exceed {MAX_PRICE_PER_DAY}"
        )));
    }
    Ok(())
}

fn ensure_seats(seats: i64) -> CatalogResult<()> {
    if seats <= 0 {
        return Err(CatalogError::Invalid("Seats must be greater than 0".into()));
    }
    Ok(())
}

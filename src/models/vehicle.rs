//! Fleet vehicles and their availability flag.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use std::str::FromStr;

pub type VehicleId = i64;

/// Image used when a vehicle is created without one.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transmission {
    Automatic,
    Manual,
}

impl Transmission {
    pub fn as_str(self) -> &'static str {
        match self {
            Transmission::Automatic => "Automatic",
            Transmission::Manual => "Manual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transmission must be Automatic or Manual, got `{0}`")]
pub struct UnknownTransmission(pub String);

impl FromStr for Transmission {
    type Err = UnknownTransmission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "automatic" => Ok(Transmission::Automatic),
            "manual" => Ok(Transmission::Manual),
            _ => Err(UnknownTransmission(s.to_string())),
        }
    }
}

/// A rentable vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub id: VehicleId,
    pub name: String,
    pub brand: String,
    pub category: String,

    /// Daily rate. Bookings copy this value at creation time.
    pub price_per_day: Decimal,

    pub image: String,
    pub seats: i64,
    pub transmission: Transmission,
    pub fuel: String,

    /// Gates new bookings. Flipped by booking status changes.
    pub available: bool,

    pub description: Option<String>,
    pub year: Option<i32>,
    pub mileage: Option<String>,
    pub features: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Raw `vehicles` row; decimals and features are stored as text.
#[derive(FromRow, Debug)]
pub(crate) struct VehicleRow {
    pub id: i64,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub price_per_day: String,
    pub image: String,
    pub seats: i64,
    pub transmission: String,
    pub fuel: String,
    pub available: bool,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub mileage: Option<String>,
    pub features: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<VehicleRow> for Vehicle {
    type Error = sqlx::Error;

    fn try_from(row: VehicleRow) -> Result<Self, Self::Error> {
        let price_per_day =
            Decimal::from_str(&row.price_per_day).map_err(|e| sqlx::Error::Decode(e.into()))?;
        let transmission = Transmission::from_str(&row.transmission)
            .map_err(|e| sqlx::Error::Decode(e.into()))?;
        let features: Vec<String> =
            serde_json::from_str(&row.features).map_err(|e| sqlx::Error::Decode(e.into()))?;

        Ok(Vehicle {
            id: row.id,
            name: row.name,
            brand: row.brand,
            category: row.category,
            price_per_day,
            image: row.image,
            seats: row.seats,
            transmission,
            fuel: row.fuel,
            available: row.available,
            description: row.description,
            year: row.year,
            mileage: row.mileage,
            features,
            created_at: row.created_at,
        })
    }
}

/// Fields for a new vehicle, already typed.
#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub name: String,
    pub brand: String,
    pub category: String,
    pub price_per_day: Decimal,
    pub image: Option<String>,
    pub seats: i64,
    pub transmission: Transmission,
    pub fuel: String,
    pub available: Option<bool>,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub mileage: Option<String>,
    pub features: Vec<String>,
}

/// Sparse vehicle update. `None` leaves a column untouched; for the nullable
/// columns `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct VehiclePatch {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub price_per_day: Option<Decimal>,
    pub image: Option<String>,
    pub seats: Option<i64>,
    pub transmission: Option<Transmission>,
    pub fuel: Option<String>,
    pub available: Option<bool>,
    pub description: Option<Option<String>>,
    pub year: Option<Option<i32>>,
    pub mileage: Option<Option<String>>,
    pub features: Option<Vec<String>>,
}

impl VehiclePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.brand.is_none()
            && self.category.is_none()
            && self.price_per_day.is_none()
            && self.image.is_none()
            && self.seats.is_none()
            && self.transmission.is_none()
            && self.fuel.is_none()
            && self.available.is_none()
            && self.description.is_none()
            && self.year.is_none()
            && self.mileage.is_none()
            && self.features.is_none()
    }
}

/// Catalog listing filter.
#[derive(Debug, Clone, Default)]
pub struct VehicleFilter {
    /// Exact category; `"all"` disables the filter.
    pub category: Option<String>,
    pub available: Option<bool>,
    /// Case-insensitive substring of name or brand.
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transmission_parses_case_insensitively() {
        assert_eq!("automatic".parse::<Transmission>(), Ok(Transmission::Automatic));
        assert_eq!(" Manual ".parse::<Transmission>(), Ok(Transmission::Manual));
        assert!("cvt".parse::<Transmission>().is_err());
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(VehiclePatch::default().is_empty());

        let patch = VehiclePatch {
            description: Some(None),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}

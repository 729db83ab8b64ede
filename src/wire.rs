//! JSON wire format.
//!
//! Request bodies arrive loosely typed: numbers may be sent as strings and
//! flags as `"1"`/`"true"`. Everything is converted here so the services only
//! see typed values. Responses re-expose stored columns under the names and
//! types clients expect (`id` as string, money as float, camelCase keys).

use crate::models::{
    booking::{Booking, BookingId, NewBooking},
    user::{Role, User},
    vehicle::{NewVehicle, Transmission, Vehicle, VehicleFilter, VehicleId, VehiclePatch},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, str::FromStr};
use thiserror::Error;

/// Malformed, missing or out-of-range request input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvalidInput(pub String);

type InputResult<T> = Result<T, InvalidInput>;

/// A JSON scalar as sent by clients.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Scalar::Text(s) => Cow::Borrowed(s.trim()),
            Scalar::Number(n) => Cow::Owned(n.to_string()),
            Scalar::Bool(true) => Cow::Borrowed("1"),
            Scalar::Bool(false) => Cow::Borrowed(""),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.as_text().is_empty()
    }

    /// Truthiness: `true`, non-zero numbers and `1|true|on|yes` strings.
    pub fn to_bool(&self) -> bool {
        match self {
            Scalar::Bool(b) => *b,
            Scalar::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
            Scalar::Text(s) => parse_boolish(s),
        }
    }

    fn to_decimal(&self, field: &str) -> InputResult<Decimal> {
        let text = self.as_text();
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|_| InvalidInput(format!("Field '{field}' must be a number")))
    }

    fn to_int(&self, field: &str) -> InputResult<i64> {
        let parsed = match self {
            Scalar::Number(n) => n.as_i64(),
            _ => self.as_text().parse::<i64>().ok(),
        };
        parsed.ok_or_else(|| InvalidInput(format!("Field '{field}' must be a whole number")))
    }

    fn to_date(&self, field: &str) -> InputResult<NaiveDate> {
        parse_date(&self.as_text())
            .ok_or_else(|| InvalidInput(format!("Field '{field}' must be a date (YYYY-MM-DD)")))
    }
}

/// Query-string style flag: `1`, `true`, `on`, `yes` (any case) are true,
/// everything else is false.
pub fn parse_boolish(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and RFC 3339 timestamps.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

fn required<'a>(value: &'a Option<Scalar>, field: &str) -> InputResult<&'a Scalar> {
    match value {
        Some(v) if !v.is_blank() => Ok(v),
        _ => Err(InvalidInput(format!("Field '{field}' is required"))),
    }
}

fn optional_text(value: Option<&Scalar>) -> Option<String> {
    value
        .map(|v| v.as_text().into_owned())
        .filter(|s| !s.is_empty())
}

fn parse_transmission(value: &Scalar) -> InputResult<Transmission> {
    value
        .as_text()
        .parse()
        .map_err(|e: crate::models::vehicle::UnknownTransmission| InvalidInput(e.to_string()))
}

fn parse_year(value: &Scalar) -> InputResult<Option<i32>> {
    if value.is_blank() {
        return Ok(None);
    }
    let year = value.to_int("year")?;
    i32::try_from(year)
        .map(Some)
        .map_err(|_| InvalidInput("Field 'year' is out of range".into()))
}

fn parse_id(value: &Option<Scalar>, missing: &str, noun: &str) -> InputResult<i64> {
    match value {
        Some(v) if !v.is_blank() => v
            .to_int("id")
            .map_err(|_| InvalidInput(format!("{noun} ID must be a number"))),
        _ => Err(InvalidInput(missing.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of `POST /vehicles` and `PUT /vehicles`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleBody {
    pub id: Option<Scalar>,
    pub name: Option<Scalar>,
    pub brand: Option<Scalar>,
    pub category: Option<Scalar>,
    pub price_per_day: Option<Scalar>,
    pub image: Option<Scalar>,
    pub seats: Option<Scalar>,
    pub transmission: Option<Scalar>,
    pub fuel: Option<Scalar>,
    pub available: Option<Scalar>,
    pub description: Option<Scalar>,
    pub year: Option<Scalar>,
    pub mileage: Option<Scalar>,
    pub features: Option<Vec<String>>,
}

impl VehicleBody {
    pub fn into_new_vehicle(self) -> InputResult<NewVehicle> {
        let name = required(&self.name, "name")?.as_text().into_owned();
        let brand = required(&self.brand, "brand")?.as_text().into_owned();
        let category = required(&self.category, "category")?.as_text().into_owned();
        let price_per_day = required(&self.price_per_day, "pricePerDay")?.to_decimal("pricePerDay")?;
        let seats = required(&self.seats, "seats")?.to_int("seats")?;
        let transmission = parse_transmission(required(&self.transmission, "transmission")?)?;
        let fuel = required(&self.fuel, "fuel")?.as_text().into_owned();

        let year = match &self.year {
            Some(year) => parse_year(year)?,
            None => None,
        };

        Ok(NewVehicle {
            name,
            brand,
            category,
            price_per_day,
            image: optional_text(self.image.as_ref()),
            seats,
            transmission,
            fuel,
            available: self.available.as_ref().map(Scalar::to_bool),
            description: optional_text(self.description.as_ref()),
            year,
            mileage: optional_text(self.mileage.as_ref()),
            features: self.features.unwrap_or_default(),
        })
    }

    /// Split an update body into the target id and the fields it sets.
    pub fn into_patch(self) -> InputResult<(VehicleId, VehiclePatch)> {
        let id = parse_id(&self.id, "Vehicle ID is required", "Vehicle")?;

        let patch = VehiclePatch {
            name: self.name.as_ref().map(|v| v.as_text().into_owned()),
            brand: self.brand.as_ref().map(|v| v.as_text().into_owned()),
            category: self.category.as_ref().map(|v| v.as_text().into_owned()),
            price_per_day: self
                .price_per_day
                .as_ref()
                .map(|v| v.to_decimal("pricePerDay"))
                .transpose()?,
            image: self.image.as_ref().map(|v| v.as_text().into_owned()),
            seats: self.seats.as_ref().map(|v| v.to_int("seats")).transpose()?,
            transmission: self.transmission.as_ref().map(parse_transmission).transpose()?,
            fuel: self.fuel.as_ref().map(|v| v.as_text().into_owned()),
            available: self.available.as_ref().map(Scalar::to_bool),
            description: self.description.as_ref().map(|v| optional_text(Some(v))),
            year: self.year.as_ref().map(parse_year).transpose()?,
            mileage: self.mileage.as_ref().map(|v| optional_text(Some(v))),
            features: self.features,
        };

        Ok((id, patch))
    }
}

/// Body of `POST /bookings`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingBody {
    pub vehicle_id: Option<Scalar>,
    pub start_date: Option<Scalar>,
    pub end_date: Option<Scalar>,
}

impl CreateBookingBody {
    pub fn into_new_booking(self) -> InputResult<NewBooking> {
        let vehicle_id = required(&self.vehicle_id, "vehicleId")?;
        let start_date = required(&self.start_date, "startDate")?;
        let end_date = required(&self.end_date, "endDate")?;

        Ok(NewBooking {
            vehicle_id: vehicle_id.to_int("vehicleId")?,
            start_date: start_date.to_date("startDate")?,
            end_date: end_date.to_date("endDate")?,
        })
    }
}

/// Body of `PUT /bookings`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBookingBody {
    pub id: Option<Scalar>,
    pub status: Option<Scalar>,
}

impl UpdateBookingBody {
    pub fn into_parts(self) -> InputResult<(BookingId, String)> {
        const MISSING: &str = "Booking ID and status are required";
        let status = match &self.status {
            Some(status) => status.as_text().into_owned(),
            None => return Err(InvalidInput(MISSING.into())),
        };
        let id = parse_id(&self.id, MISSING, "Booking")?;
        Ok((id, status))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginBody {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginBody {
    pub fn into_parts(self) -> InputResult<(String, String)> {
        match (self.email, self.password) {
            (Some(email), Some(password)) => Ok((email, password)),
            _ => Err(InvalidInput("Email and password are required".into())),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SignupBody {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

impl SignupBody {
    pub fn into_parts(self) -> InputResult<(String, String, String)> {
        match (self.email, self.password, self.name) {
            (Some(email), Some(password), Some(name)) => Ok((email, password, name)),
            _ => Err(InvalidInput("Email, password, and name are required".into())),
        }
    }
}

/// `GET /vehicles` query string.
#[derive(Debug, Default, Deserialize)]
pub struct VehicleQuery {
    pub category: Option<String>,
    pub available: Option<String>,
    pub search: Option<String>,
}

impl From<VehicleQuery> for VehicleFilter {
    fn from(query: VehicleQuery) -> Self {
        VehicleFilter {
            category: query.category.filter(|c| !c.is_empty()),
            available: query.available.as_deref().map(parse_boolish),
            search: query
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }
}

/// `GET /bookings` query string.
#[derive(Debug, Default, Deserialize)]
pub struct BookingQuery {
    pub status: Option<String>,
}

/// `?id=` on delete routes.
#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

impl IdQuery {
    pub fn require(&self, noun: &str) -> InputResult<i64> {
        let id = self.id.clone().map(Scalar::Text);
        parse_id(&id, &format!("{noun} ID is required"), noun)
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Uniform response body: `{success, message, data?}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: "Success".into(),
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

fn money(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn timestamp(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VehicleView {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub image: String,
    pub seats: i64,
    pub transmission: &'static str,
    pub fuel: String,
    pub available: bool,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub mileage: Option<String>,
    pub features: Vec<String>,
    pub created_at: String,
    #[serde(rename = "pricePerDay")]
    pub price_per_day: f64,
}

impl From<&Vehicle> for VehicleView {
    fn from(v: &Vehicle) -> Self {
        Self {
            id: v.id.to_string(),
            name: v.name.clone(),
            brand: v.brand.clone(),
            category: v.category.clone(),
            image: v.image.clone(),
            seats: v.seats,
            transmission: v.transmission.as_str(),
            fuel: v.fuel.clone(),
            available: v.available,
            description: v.description.clone(),
            year: v.year,
            mileage: v.mileage.clone(),
            features: v.features.clone(),
            created_at: timestamp(&v.created_at),
            price_per_day: money(v.price_per_day),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub id: String,
    pub status: &'static str,
    #[serde(rename = "created_at")]
    pub created_at: String,
    pub booking_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub vehicle_id: String,
    pub vehicle_name: String,
    pub start_date: String,
    pub end_date: String,
    pub total_days: i64,
    pub price_per_day: f64,
    pub total_amount: f64,
    pub user_id: String,
}

impl From<&Booking> for BookingView {
    fn from(b: &Booking) -> Self {
        Self {
            id: b.id.to_string(),
            status: b.status.as_str(),
            created_at: timestamp(&b.created_at),
            booking_number: b.booking_number.clone(),
            customer_name: b.customer_name.clone(),
            customer_email: b.customer_email.clone(),
            vehicle_id: b.vehicle_id.to_string(),
            vehicle_name: b.vehicle_name.clone(),
            start_date: b.start_date.format("%Y-%m-%d").to_string(),
            end_date: b.end_date.format("%Y-%m-%d").to_string(),
            total_days: b.total_days,
            price_per_day: money(b.price_per_day),
            total_amount: money(b.total_amount),
            user_id: b.user_id.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: UserView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct VehicleData {
    pub vehicle: VehicleView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct VehicleListData {
    pub vehicles: Vec<VehicleView>,
    pub count: usize,
}

impl VehicleListData {
    pub fn new(vehicles: &[Vehicle]) -> Self {
        Self {
            vehicles: vehicles.iter().map(VehicleView::from).collect(),
            count: vehicles.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingData {
    pub booking: BookingView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct BookingListData {
    pub bookings: Vec<BookingView>,
    pub count: usize,
}

impl BookingListData {
    pub fn new(bookings: &[Booking]) -> Self {
        Self {
            bookings: bookings.iter().map(BookingView::from).collect(),
            count: bookings.len(),
        }
    }
}

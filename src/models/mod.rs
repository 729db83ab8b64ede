//! Core data models for the car rental service.
//!
//! Domain structs carry typed values (`Decimal` prices, `NaiveDate` dates,
//! enums for statuses). The `*Row` structs mirror the SQLite columns and are
//! converted at the storage boundary.

pub mod booking;
pub mod user;
pub mod vehicle;

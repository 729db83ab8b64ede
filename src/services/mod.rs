//! Business services. Each owns its SQLite queries and its error type.

pub mod account_service;
pub mod catalog_service;
pub mod ledger_service;
pub mod session_store;

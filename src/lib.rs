//! Car rental booking API: fleet catalog, booking ledger and the session
//! layer in front of them.

pub mod access;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod wire;

use axum::Router;

/// The full application router with `state` attached.
pub fn app(state: state::AppState) -> Router {
    routes::routes::routes().with_state(state)
}

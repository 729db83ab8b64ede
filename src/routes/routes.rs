//! Defines routes for the car rental API.
//!
//! ## Structure
//! - **Auth**
//!   - `POST /auth/login`, `POST /auth/signup`, `POST /auth/logout`, `GET /auth/me`
//!
//! - **Vehicles**
//!   - `GET    /vehicles`      : list, filtered by `category`, `available`, `search`
//!   - `POST   /vehicles`      : create (admin)
//!   - `PUT    /vehicles`      : update, id in body (admin)
//!   - `DELETE /vehicles?id=`  : delete (admin)
//!   - `GET    /vehicles/{id}` : show
//!
//! - **Bookings**
//!   - `GET    /bookings`      : list, optionally by `status`
//!   - `POST   /bookings`      : create
//!   - `PUT    /bookings`      : status change (admin)
//!   - `DELETE /bookings?id=`  : cancel (owner or admin)
//!   - `GET    /bookings/{id}` : show (owner or admin)
//!
//! Unknown paths and unsupported methods answer with the JSON error envelope.

use crate::{
    handlers::{
        auth_handlers::{login, logout, me, signup},
        booking_handlers::{
            cancel_booking, create_booking, get_booking, list_bookings, update_booking,
        },
        health_handlers::{healthz, method_not_allowed, not_found, readyz},
        vehicle_handlers::{
            create_vehicle, delete_vehicle, get_vehicle, list_vehicles, update_vehicle,
        },
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build the router. State is attached by the caller with `with_state`.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // session provider
        .route("/auth/login", post(login).fallback(method_not_allowed))
        .route("/auth/signup", post(signup).fallback(method_not_allowed))
        .route("/auth/logout", post(logout).fallback(method_not_allowed))
        .route("/auth/me", get(me).fallback(method_not_allowed))
        // fleet catalog
        .route(
            "/vehicles",
            get(list_vehicles)
                .post(create_vehicle)
                .put(update_vehicle)
                .delete(delete_vehicle)
                .fallback(method_not_allowed),
        )
        .route(
            "/vehicles/{id}",
            get(get_vehicle).fallback(method_not_allowed),
        )
        // booking ledger
        .route(
            "/bookings",
            get(list_bookings)
                .post(create_booking)
                .put(update_booking)
                .delete(cancel_booking)
                .fallback(method_not_allowed),
        )
        .route(
            "/bookings/{id}",
            get(get_booking).fallback(method_not_allowed),
        )
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
}

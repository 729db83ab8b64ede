//! Booking ledger endpoints. Every route needs a session; ownership and
//! admin checks happen in `LedgerService`.

use crate::{
    access::AccessDenied,
    errors::AppError,
    handlers::session::CurrentSession,
    models::user::Identity,
    state::AppState,
    wire::{
        BookingData, BookingListData, BookingQuery, BookingView, CreateBookingBody, Envelope,
        IdQuery, UpdateBookingBody,
    },
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};

fn signed_in(session: CurrentSession) -> Result<Identity, AccessDenied> {
    session.identity.ok_or(AccessDenied::Unauthenticated)
}

/// `GET /bookings`
pub async fn list_bookings(
    State(state): State<AppState>,
    session: CurrentSession,
    query: Result<Query<BookingQuery>, QueryRejection>,
) -> Result<Json<Envelope<BookingListData>>, AppError> {
    let actor = signed_in(session)?;
    let Query(query) = query?;

    let bookings = state.ledger.list(&actor, query.status.as_deref()).await?;
    Ok(Json(Envelope::ok(BookingListData::new(&bookings))))
}

/// `GET /bookings/{id}`
pub async fn get_booking(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
) -> Result<Json<Envelope<BookingData>>, AppError> {
    let actor = signed_in(session)?;
    let id = id
        .trim()
        .parse()
        .map_err(|_| AppError::not_found("Booking not found"))?;

    let booking = state.ledger.get(id, &actor).await?;
    Ok(Json(Envelope::ok(BookingData {
        booking: BookingView::from(&booking),
        message: None,
    })))
}

/// `POST /bookings`
pub async fn create_booking(
    State(state): State<AppState>,
    session: CurrentSession,
    body: Result<Json<CreateBookingBody>, JsonRejection>,
) -> Result<Json<Envelope<BookingData>>, AppError> {
    let actor = signed_in(session)?;
    let Json(body) = body?;

    let booking = state
        .ledger
        .create_booking(&actor, body.into_new_booking()?)
        .await?;
    Ok(Json(Envelope::ok(BookingData {
        booking: BookingView::from(&booking),
        message: Some("Booking created successfully"),
    })))
}

/// `PUT /bookings` (admin)
pub async fn update_booking(
    State(state): State<AppState>,
    session: CurrentSession,
    body: Result<Json<UpdateBookingBody>, JsonRejection>,
) -> Result<Json<Envelope<BookingData>>, AppError> {
    let actor = signed_in(session)?;
    let Json(body) = body?;
    let (id, status) = body.into_parts()?;

    let booking = state.ledger.update_status(id, &status, &actor).await?;
    Ok(Json(Envelope::ok(BookingData {
        booking: BookingView::from(&booking),
        message: Some("Booking status updated successfully"),
    })))
}

/// `DELETE /bookings?id=` cancels the booking.
pub async fn cancel_booking(
    State(state): State<AppState>,
    session: CurrentSession,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> Result<Json<Envelope<()>>, AppError> {
    let actor = signed_in(session)?;
    let Query(query) = query?;
    let id = query.require("Booking")?;

    state.ledger.cancel(id, &actor).await?;
    Ok(Json(Envelope::message("Booking cancelled successfully")))
}

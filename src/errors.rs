use crate::{
    access::AccessDenied,
    services::{
        account_service::AccountError, catalog_service::CatalogError, ledger_service::LedgerError,
    },
    wire::InvalidInput,
};
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Message returned for every 500. The underlying cause is only logged.
pub const INTERNAL_MESSAGE: &str = "An unexpected error occurred";

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error. The detail goes to the log,
    /// the client only sees [`INTERNAL_MESSAGE`].
    pub fn internal(detail: impl fmt::Display) -> Self {
        tracing::error!("unexpected failure: {}", detail);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_client_error() {
            tracing::warn!(status = self.status.as_u16(), "{}", self.message);
        }

        let body = Json(json!({
            "success": false,
            "message": self.message,
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err)
    }
}

impl From<InvalidInput> for AppError {
    fn from(err: InvalidInput) -> Self {
        AppError::bad_request(err.0)
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        tracing::debug!("rejected request body: {}", err.body_text());
        AppError::bad_request("Invalid JSON request body")
    }
}

impl From<QueryRejection> for AppError {
    fn from(err: QueryRejection) -> Self {
        tracing::debug!("rejected query string: {}", err.body_text());
        AppError::bad_request("Invalid query parameters")
    }
}

impl From<AccessDenied> for AppError {
    fn from(err: AccessDenied) -> Self {
        match err {
            AccessDenied::Unauthenticated => AppError::unauthorized(err.to_string()),
            AccessDenied::Forbidden(_) => AppError::forbidden(err.to_string()),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::VehicleNotFound(_) => AppError::not_found("Vehicle not found"),
            CatalogError::Invalid(msg) => AppError::bad_request(msg),
            CatalogError::NothingToUpdate => AppError::bad_request(err.to_string()),
            CatalogError::HasActiveBookings(_) => {
                AppError::conflict("Cannot delete vehicle with active bookings")
            }
            CatalogError::Sqlx(e) => AppError::internal(e),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::BookingNotFound(_) => AppError::not_found("Booking not found"),
            LedgerError::VehicleNotFound(_) => AppError::not_found("Vehicle not found"),
            LedgerError::VehicleUnavailable(_)
            | LedgerError::InvalidDates
            | LedgerError::AmountOutOfRange
            | LedgerError::InvalidStatus(_) => AppError::bad_request(err.to_string()),
            LedgerError::AlreadyCancelled(_)
            | LedgerError::AlreadyCompleted(_)
            | LedgerError::BookingNumberTaken(_) => AppError::conflict(err.to_string()),
            LedgerError::Denied(denied) => denied.into(),
            LedgerError::Sqlx(e) => AppError::internal(e),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Invalid(msg) => AppError::bad_request(msg),
            AccountError::InvalidCredentials => AppError::unauthorized(err.to_string()),
            AccountError::EmailTaken => AppError::conflict(err.to_string()),
            AccountError::UserNotFound(_) => AppError::not_found(err.to_string()),
            AccountError::Hash(e) => AppError::internal(e),
            AccountError::Join(e) => AppError::internal(e),
            AccountError::Sqlx(e) => AppError::internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn internal_errors_do_not_leak_detail() {
        let response =
            AppError::internal("no such table: bookings (code 1) at /srv/db.sqlite").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], INTERNAL_MESSAGE);
        assert!(body.get("data").is_none());
    }

    #[test]
    fn ledger_conflicts_map_to_409() {
        let err: AppError = LedgerError::AlreadyCancelled(7).into();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.message, "Booking is already cancelled");
    }

    #[test]
    fn access_denied_maps_to_401_and_403() {
        let unauth: AppError = AccessDenied::Unauthenticated.into();
        assert_eq!(unauth.status, StatusCode::UNAUTHORIZED);

        let forbidden: AppError = AccessDenied::Forbidden("Admin access required").into();
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
        assert_eq!(forbidden.message, "Admin access required");
    }
}

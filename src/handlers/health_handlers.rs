//! Health & readiness handlers, plus the envelope fallbacks for unknown
//! routes and methods.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks DB connectivity

use crate::{errors::AppError, state::AppState};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;

/// Reported for a failed check; the cause is only logged.
const UNAVAILABLE: &str = "database unavailable";

/// `GET /healthz`
///
/// Never performs I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Runs `SELECT 1` against SQLite. HTTP 200 when it answers, 503 otherwise.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let sqlite_check = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&*state.db)
        .await
    {
        Ok(1) => (true, None::<String>),
        Ok(v) => {
            tracing::warn!("readiness check returned {}", v);
            (false, Some(UNAVAILABLE.to_string()))
        }
        Err(e) => {
            tracing::warn!("readiness check failed: {}", e);
            (false, Some(UNAVAILABLE.to_string()))
        }
    };

    let ok = sqlite_check.0;
    let mut checks = HashMap::new();
    checks.insert(
        "sqlite",
        CheckStatus {
            ok,
            error: sqlite_check.1,
        },
    );

    let body = ReadyResponse {
        status: if ok { "ok".into() } else { "error".into() },
        checks,
    };

    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// Fallback for known paths hit with an unsupported method.
pub async fn method_not_allowed() -> AppError {
    AppError::method_not_allowed()
}

/// Fallback for unknown paths.
pub async fn not_found() -> AppError {
    AppError::not_found("Endpoint not found")
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

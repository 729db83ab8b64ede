//! Session extraction.
//!
//! The token travels in the `rental_session` cookie set at login, or in an
//! `Authorization: Bearer <token>` header. A missing or stale token is not a
//! rejection: handlers decide through [`crate::access`] whether they need one.

use crate::{models::user::Identity, state::AppState};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, header, request::Parts},
};
use std::convert::Infallible;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "rental_session";

/// The caller's session, if any.
#[derive(Debug, Clone, Default)]
pub struct CurrentSession {
    pub token: Option<Uuid>,
    pub identity: Option<Identity>,
}

impl CurrentSession {
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Ok(CurrentSession::default());
        };

        let identity = state.sessions.lookup(&token).await;
        if identity.is_none() {
            tracing::debug!("unknown session token presented");
        }

        Ok(CurrentSession {
            token: identity.as_ref().map(|_| token),
            identity,
        })
    }
}

/// Pull the session token from the cookie, falling back to a bearer header.
pub fn session_token(headers: &HeaderMap) -> Option<Uuid> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|token| Uuid::parse_str(token.trim()).ok())
    })
}

pub fn session_cookie(token: Uuid) -> HeaderValue {
    // A hyphenated UUID is always a valid header value.
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax"
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("rental_session=; Path=/"))
}

pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("rental_session=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}

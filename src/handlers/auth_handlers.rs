//! Login, signup, logout and current-user endpoints.

use crate::{
    access::AccessDenied,
    errors::AppError,
    handlers::session::{CurrentSession, clear_session_cookie, session_cookie},
    models::user::User,
    services::account_service::AccountError,
    state::AppState,
    wire::{Envelope, LoginBody, SignupBody, UserData, UserView},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
};

/// `POST /auth/login`
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = body?;
    let (email, password) = body.into_parts()?;

    let user = state.accounts.login(&email, &password).await?;
    Ok(open_session(&state, &user, "Login successful").await)
}

/// `POST /auth/signup`
pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignupBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = body?;
    let (email, password, name) = body.into_parts()?;

    let user = state.accounts.signup(&email, &password, &name).await?;
    Ok(open_session(&state, &user, "Account created successfully").await)
}

/// `POST /auth/logout`
pub async fn logout(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Response, AppError> {
    let token = session.token.ok_or(AccessDenied::Unauthenticated)?;
    state.sessions.close(&token).await;

    Ok((
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(Envelope::message("Logged out successfully")),
    )
        .into_response())
}

/// `GET /auth/me`
///
/// A session whose account has since been removed is dropped.
pub async fn me(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Json<Envelope<UserData>>, AppError> {
    let (Some(token), Some(identity)) = (session.token, session.identity) else {
        return Err(AccessDenied::Unauthenticated.into());
    };

    match state.accounts.find(identity.id).await {
        Ok(user) => Ok(Json(Envelope::ok(UserData {
            user: UserView::from(&user),
            message: None,
        }))),
        Err(err @ AccountError::UserNotFound(_)) => {
            state.sessions.close(&token).await;
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

async fn open_session(
    state: &AppState,
    user: &User,
    message: &'static str,
) -> Response {
    let token = state.sessions.open(user.identity()).await;
    let body = Envelope::ok(UserData {
        user: UserView::from(user),
        message: Some(message),
    });

    ([(header::SET_COOKIE, session_cookie(token))], Json(body)).into_response()
}

//! REST API handlers for sign-in, sign-out and password recovery

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::warn;

use super::models::{AuthState, MemoryTokenStore};
use super::session::AuthSession;
use crate::api::models::{LoginRequest, MessageResponse, PasswordResetRequest, RegisterRequest};
use crate::error::Result;
use crate::state::{expired_session_cookie, with_session_cookie, AppState, Session, SharedState};

/// Creates routes for auth-related operations
pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/password-reset", post(request_password_reset))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/reset-password", post(reset_password))
}

/// Endpoint: POST /auth/login
async fn login(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Response {
    let (session_id, session, created) = state.session(&headers);

    session.cart.reset();
    let outcome = session.auth.login(&payload.email, &payload.password).await;
    let outcome = signed_in(&session, outcome.map(|_| ())).await;

    finish_sign_in(&state, outcome, &session_id, created)
}

/// Endpoint: POST /auth/register
async fn register(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Response {
    let (session_id, session, created) = state.session(&headers);

    session.cart.reset();
    let outcome = session.auth.register(payload).await;
    let outcome = signed_in(&session, outcome.map(|_| ())).await;

    finish_sign_in(&state, outcome, &session_id, created)
}

/// Endpoint: POST /auth/logout
/// Ends the session and tells the browser to drop its cookie.
async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let Some((session_id, session)) = state.find_session(&headers) else {
        return Json(AuthState::Anonymous).into_response();
    };

    session.sign_out();
    state.end_session(&session_id);

    let mut response = Json(session.auth.state()).into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, expired_session_cookie());
    response
}

/// Endpoint: GET /auth/me
/// Re-validates the token with the API before answering.
async fn me(State(state): State<SharedState>, headers: HeaderMap) -> Json<AuthState> {
    let Some((_, session)) = state.find_session(&headers) else {
        return Json(AuthState::Anonymous);
    };

    let current = if session.auth.is_authenticated() {
        let restored = session.auth.restore().await;
        if restored == AuthState::Anonymous {
            session.cart.reset();
        }
        restored
    } else {
        session.auth.state()
    };

    Json(current)
}

/// Endpoint: POST /auth/password-reset
async fn request_password_reset(
    State(state): State<SharedState>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<Json<MessageResponse>> {
    recovery(&state)
        .request_password_reset(&payload.email)
        .await
        .map(message)
}

/// Endpoint: POST /auth/verify-otp
async fn verify_otp(
    State(state): State<SharedState>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<Json<MessageResponse>> {
    let otp = payload.otp.as_deref().unwrap_or_default();

    recovery(&state).verify_otp(&payload.email, otp).await.map(message)
}

/// Endpoint: POST /auth/reset-password
async fn reset_password(
    State(state): State<SharedState>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<Json<MessageResponse>> {
    let otp = payload.otp.as_deref().unwrap_or_default();
    let new_password = payload.new_password.as_deref().unwrap_or_default();

    recovery(&state)
        .reset_password(&payload.email, otp, new_password)
        .await
        .map(message)
}

/// An `AuthSession` for password recovery that never enters the session map.
fn recovery(state: &AppState) -> AuthSession {
    AuthSession::new(state.backends.auth.clone(), Arc::new(MemoryTokenStore::default()))
}

/// A session created for a sign-in that failed is dropped again and no
/// cookie is issued for it.
fn finish_sign_in(state: &AppState, outcome: Result<Json<AuthState>>, session_id: &str, created: bool) -> Response {
    if outcome.is_err() && created {
        state.end_session(session_id);
        return outcome.into_response();
    }

    with_session_cookie(outcome, session_id, created)
}

/// Loads the new customer's cart and answers with the auth state. A cart
/// failure is logged; the sign-in itself still succeeded.
async fn signed_in(session: &Session, outcome: Result<()>) -> Result<Json<AuthState>> {
    outcome?;

    let credentials = session.credentials()?;
    if let Err(error) = session.guard(session.cart.fetch(&credentials).await) {
        warn!(%error, "could not load cart after sign-in");
    }

    Ok(Json(session.auth.state()))
}

fn message(text: String) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: Some(text),
    })
}

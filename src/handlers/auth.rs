//! Session HTTP handlers.
//!
//! - POST /tokens - Log in, set the session cookie
//! - POST /tokens/logout - Expire the session cookie
//! - GET /tokens/validate - Who the current session belongs to

use std::sync::Arc;

use axum::{Json, extract::State, http::HeaderMap, http::StatusCode};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    error::AppError,
    middleware::auth::{self, removal_cookie, session_cookie},
    models::auth::{LoginRequest, LoginResponse},
    services::auth_service,
};

/// Log in with email and password.
///
/// # Endpoint
///
/// `POST /tokens`
///
/// # Request Body
///
/// ```json
/// { "email": "ada@example.com", "password": "correct horse" }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: `{user_id, email, is_admin}` plus an HttpOnly session cookie
/// - **Error (401)**: Unknown email or wrong password
///
/// A login notification is published on `/topic/auth`.
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let user = auth_service::authenticate(&state.pool, &request.email, &request.password).await?;
    let token = auth::issue_token(&user, &state.config)?;

    tracing::info!(user_id = user.id, "User logged in");
    state.hub.notify_auth(format!("User logged in: {}", user.email));

    let response = LoginResponse {
        user_id: user.id,
        email: user.email,
        is_admin: user.is_admin,
    };
    Ok((jar.add(session_cookie(token, &state.config)), Json(response)))
}

/// `POST /tokens/logout`
///
/// Always succeeds; the cookie is replaced by an expired one.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (StatusCode, CookieJar) {
    (StatusCode::NO_CONTENT, jar.add(removal_cookie(&state.config)))
}

/// `GET /tokens/validate`
///
/// Returns 401 when there is no valid session.
pub async fn validate(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Json<LoginResponse>, AppError> {
    let auth = auth::authenticate(&jar, &headers, &state.config)?;
    Ok(Json(LoginResponse {
        user_id: auth.user_id,
        email: auth.email,
        is_admin: auth.is_admin,
    }))
}

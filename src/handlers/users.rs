//! User account HTTP handlers.
//!
//! - POST /user - Register (public)
//! - GET /users - List all users (admin)
//! - GET /user/{id} - Get one user (public)
//! - PUT /user/{id} - Update profile (self or admin)
//! - DELETE /user/{id} - Delete account (self or admin)
//! - GET /active-users - Connected WebSocket sessions

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::user::{CreateUserRequest, UpdateUserRequest, UserResponse},
    services::user_service,
};

/// Register a new customer.
///
/// # Endpoint
///
/// `POST /user`
///
/// # Response
///
/// - **Success (201 Created)**: The user, without password hash
/// - **Error (400)**: Validation failed
/// - **Error (409)**: Email already registered
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = user_service::create_user(&state.pool, request).await?;
    state.hub.notify_auth(format!("New user registered: {}", user.email));
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    auth.ensure_admin()?;
    let users = user_service::list_users(&state.pool).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserResponse>, AppError> {
    let user = user_service::get_user(&state.pool, user_id).await?;
    Ok(Json(user.into()))
}

/// Update profile fields. The password and admin flag cannot be changed here.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth.ensure_self_or_admin(user_id)?;
    let user = user_service::update_user(&state.pool, user_id, request).await?;
    Ok(Json(user.into()))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth.ensure_self_or_admin(user_id)?;
    user_service::delete_user(&state.pool, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /active-users`
pub async fn active_users(State(state): State<Arc<AppState>>) -> Json<usize> {
    Json(state.hub.active_users())
}

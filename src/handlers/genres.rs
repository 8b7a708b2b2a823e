//! Genre catalogue handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState, error::AppError, middleware::auth::AuthContext, models::genre::Genre,
    services::genre_service,
};

pub async fn list_genres(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Genre>>, AppError> {
    Ok(Json(genre_service::list_genres(&state.pool).await?))
}

pub async fn get_genre(
    State(state): State<Arc<AppState>>,
    Path(genre_id): Path<i64>,
) -> Result<Json<Genre>, AppError> {
    Ok(Json(genre_service::get_genre(&state.pool, genre_id).await?))
}

/// `POST /genres/{name}` (admin)
///
/// `name` must be one of the catalogue genres, in any case and with `_`, `-`
/// or space separators. Creating an existing genre is not an error.
pub async fn create_genre(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(name): Path<String>,
) -> Result<(StatusCode, String), AppError> {
    auth.ensure_admin()?;
    let genre = genre_service::create_genre(&state.pool, &name).await?;
    Ok((StatusCode::CREATED, format!("Genre created: {}", genre.name)))
}

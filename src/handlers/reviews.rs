//! Review HTTP handlers.
//!
//! - POST /reviews - Review a record (authenticated)
//! - GET /reviews/{id}, GET /reviews/record/{record_id} - Read reviews (public)
//! - PUT /reviews/{id}, DELETE /reviews/{id} - Author or admin

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
    models::review::{CreateReviewRequest, Review, UpdateReviewRequest},
    services::review_service,
};

/// Review a record.
///
/// # Endpoint
///
/// `POST /reviews`
///
/// # Request Body
///
/// ```json
/// { "user_id": 12, "record_id": 4, "rating": 5, "comment": "Flawless pressing" }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: The stored review
/// - **Error (400)**: Rating outside 1..=5
/// - **Error (403)**: Reviewing as another user without admin rights
/// - **Error (404)**: Unknown record
/// - **Error (409)**: This user already reviewed this record
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    auth.ensure_self_or_admin(request.user_id)?;
    let review = review_service::create_review(&state.pool, request).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn get_review(
    State(state): State<Arc<AppState>>,
    Path(review_id): Path<i64>,
) -> Result<Json<Review>, AppError> {
    Ok(Json(review_service::get_review(&state.pool, review_id).await?))
}

pub async fn reviews_for_record(
    State(state): State<Arc<AppState>>,
    Path(record_id): Path<i64>,
) -> Result<Json<Vec<Review>>, AppError> {
    Ok(Json(
        review_service::reviews_for_record(&state.pool, record_id).await?,
    ))
}

pub async fn update_review(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(review_id): Path<i64>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<Review>, AppError> {
    let existing = review_service::get_review(&state.pool, review_id).await?;
    auth.ensure_self_or_admin(existing.user_id)?;
    Ok(Json(
        review_service::update_review(&state.pool, review_id, request).await?,
    ))
}

pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(review_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let existing = review_service::get_review(&state.pool, review_id).await?;
    auth.ensure_self_or_admin(existing.user_id)?;
    review_service::delete_review(&state.pool, review_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Basket HTTP handlers.
//!
//! Every route acts on one user's basket; the caller must be that user or an admin.

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
    models::basket::{
        AddToBasketRequest, BasketResponse, BasketTotalResponse, UpdateBasketItemRequest,
    },
    services::basket_service,
};

pub async fn get_basket(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<i64>,
) -> Result<Json<BasketResponse>, AppError> {
    auth.ensure_self_or_admin(user_id)?;
    Ok(Json(basket_service::get_basket(&state.pool, user_id).await?))
}

/// Add a record to a basket, creating the basket if needed.
///
/// # Endpoint
///
/// `POST /basket/add`
///
/// # Request Body
///
/// ```json
/// { "user_id": 12, "record_id": 4, "quantity": 1 }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: The whole basket
/// - **Error (400)**: Non-positive quantity, or more than the stock
/// - **Error (403)**: Someone else's basket
/// - **Error (404)**: Unknown record
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<AddToBasketRequest>,
) -> Result<(StatusCode, Json<BasketResponse>), AppError> {
    auth.ensure_self_or_admin(request.user_id)?;
    let basket = basket_service::add_item(
        &state.pool,
        request.user_id,
        request.record_id,
        request.quantity,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(basket)))
}

pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<UpdateBasketItemRequest>,
) -> Result<Json<BasketResponse>, AppError> {
    auth.ensure_self_or_admin(request.user_id)?;
    let basket = basket_service::update_item(
        &state.pool,
        request.user_id,
        request.record_id,
        request.quantity,
    )
    .await?;
    Ok(Json(basket))
}

pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path((user_id, record_id)): Path<(i64, i64)>,
) -> Result<Json<BasketResponse>, AppError> {
    auth.ensure_self_or_admin(user_id)?;
    Ok(Json(
        basket_service::remove_item(&state.pool, user_id, record_id).await?,
    ))
}

pub async fn clear_basket(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<i64>,
) -> Result<Json<BasketResponse>, AppError> {
    auth.ensure_self_or_admin(user_id)?;
    Ok(Json(basket_service::clear_basket(&state.pool, user_id).await?))
}

/// `GET /basket/{user_id}/total`, priced at current record prices.
pub async fn basket_total(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<i64>,
) -> Result<Json<BasketTotalResponse>, AppError> {
    auth.ensure_self_or_admin(user_id)?;
    Ok(Json(basket_service::basket_total(&state.pool, user_id).await?))
}

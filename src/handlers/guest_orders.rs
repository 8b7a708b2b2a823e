//! Guest order HTTP handlers.
//!
//! Reads are admin only since guest orders hold personal contact details.

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
    models::guest::{CreateGuestOrderRequest, GuestOrder},
    services::guest_service,
};

/// Attach guest details to a purchase.
///
/// # Endpoint
///
/// `POST /guest-orders`
///
/// # Response
///
/// - **Success (201 Created)**: The saved guest order
/// - **Error (400)**: Details failed validation
/// - **Error (404)**: Unknown purchase id
pub async fn create_guest_order(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateGuestOrderRequest>,
) -> Result<(StatusCode, Json<GuestOrder>), AppError> {
    let order = guest_service::create_guest_order(
        &state.pool,
        request.purchase_history_id,
        request.details,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /guest-orders/{purchase_id}`: the first matching order.
pub async fn get_guest_order(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(purchase_id): Path<i64>,
) -> Result<Json<GuestOrder>, AppError> {
    auth.ensure_admin()?;
    guest_service::guest_orders_for_purchase(&state.pool, purchase_id)
        .await?
        .into_iter()
        .next()
        .map(Json)
        .ok_or(AppError::GuestOrderNotFound)
}

/// `GET /guest-orders/by-order/{purchase_id}`: all matching orders, 404 if none.
pub async fn guest_orders_for_purchase(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(purchase_id): Path<i64>,
) -> Result<Json<Vec<GuestOrder>>, AppError> {
    auth.ensure_admin()?;
    let orders = guest_service::guest_orders_for_purchase(&state.pool, purchase_id).await?;
    if orders.is_empty() {
        return Err(AppError::GuestOrderNotFound);
    }
    Ok(Json(orders))
}

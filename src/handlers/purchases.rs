//! Purchase history HTTP handlers.
//!
//! Customers read their own orders; everything that spans customers
//! (listings, statistics, the dashboard) is admin only.

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
    models::{
        purchase::{AdminDashboard, CreatePurchaseRequest, Purchase, PurchaseStats},
        record::{InventoryUpdate, InventoryUpdateType},
    },
    services::purchase_service,
};

/// Only the buyer or an admin may see a purchase. Guest rows are admin only.
fn ensure_can_view(auth: &AuthContext, purchase: &Purchase) -> Result<(), AppError> {
    match purchase.user_id {
        Some(owner) => auth.ensure_self_or_admin(owner),
        None => auth.ensure_admin(),
    }
}

/// Record a purchase directly, outside the checkout flow.
///
/// # Endpoint
///
/// `POST /purchase-history` (admin)
///
/// # Response
///
/// - **Success (201 Created)**: The purchase row
/// - **Error (400)**: Invalid fields or not enough stock
/// - **Error (404)**: Unknown record
pub async fn create_purchase(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreatePurchaseRequest>,
) -> Result<(StatusCode, Json<Purchase>), AppError> {
    auth.ensure_admin()?;
    let (purchase, record) = purchase_service::create_purchase(&state.pool, request).await?;
    state.hub.publish_inventory_update(&InventoryUpdate::for_record(
        &record,
        InventoryUpdateType::Purchased,
    ));
    Ok((StatusCode::CREATED, Json(purchase)))
}

pub async fn purchases_for_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Purchase>>, AppError> {
    auth.ensure_self_or_admin(user_id)?;
    Ok(Json(
        purchase_service::purchases_for_user(&state.pool, user_id).await?,
    ))
}

pub async fn get_purchase(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(purchase_id): Path<i64>,
) -> Result<Json<Purchase>, AppError> {
    let purchase = purchase_service::get_purchase(&state.pool, purchase_id).await?;
    ensure_can_view(&auth, &purchase)?;
    Ok(Json(purchase))
}

/// `GET /purchase-history/related/{id}`: every line sharing the order number.
pub async fn related_purchases(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(purchase_id): Path<i64>,
) -> Result<Json<Vec<Purchase>>, AppError> {
    let purchase = purchase_service::get_purchase(&state.pool, purchase_id).await?;
    ensure_can_view(&auth, &purchase)?;
    Ok(Json(
        purchase_service::order_lines(&state.pool, &purchase).await?,
    ))
}

pub async fn delete_purchase(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(purchase_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth.ensure_admin()?;
    purchase_service::delete_purchase(&state.pool, purchase_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn all_purchases(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Purchase>>, AppError> {
    auth.ensure_admin()?;
    Ok(Json(purchase_service::all_purchases(&state.pool).await?))
}

pub async fn recent_purchases(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Purchase>>, AppError> {
    auth.ensure_admin()?;
    Ok(Json(purchase_service::recent_purchases(&state.pool).await?))
}

pub async fn stats(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<PurchaseStats>, AppError> {
    auth.ensure_admin()?;
    Ok(Json(purchase_service::stats(&state.pool).await?))
}

/// `GET /purchase-history/admin/dashboard`
///
/// Active users comes from the live WebSocket session count.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<AdminDashboard>, AppError> {
    auth.ensure_admin()?;
    Ok(Json(
        purchase_service::dashboard(&state.pool, state.hub.active_users()).await?,
    ))
}

//! Coupon HTTP handlers.

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
    models::coupon::{
        Coupon, CouponValidationResponse, GenerateCouponRequest, GenerateCouponResponse,
    },
    services::coupon_service,
};

/// `POST /coupons/generate`
///
/// Issues a frequent-shopper coupon when the user qualifies;
/// `generated` tells whether one was created.
pub async fn generate_coupon(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<GenerateCouponRequest>,
) -> Result<Json<GenerateCouponResponse>, AppError> {
    auth.ensure_self_or_admin(request.user_id)?;
    let generated =
        coupon_service::generate_frequent_shopper_coupon(&state.pool, request.user_id).await?;
    Ok(Json(GenerateCouponResponse { generated }))
}

pub async fn coupons_for_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Coupon>>, AppError> {
    auth.ensure_self_or_admin(user_id)?;
    Ok(Json(
        coupon_service::coupons_for_user(&state.pool, user_id).await?,
    ))
}

/// `POST /coupons/{code}/use`
pub async fn use_coupon(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut conn = state.pool.acquire().await?;
    if coupon_service::mark_used(&mut conn, &code).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::CouponNotFound)
    }
}

/// `GET /coupons/validate/{code}` (public)
///
/// 404 "Invalid or expired coupon" unless the coupon exists, is unused and unexpired.
pub async fn validate_coupon(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<CouponValidationResponse>, AppError> {
    let coupon = coupon_service::find_by_code(&state.pool, &code)
        .await?
        .filter(|coupon| coupon.is_redeemable(chrono::Utc::now()))
        .ok_or(AppError::CouponNotFound)?;

    Ok(Json(CouponValidationResponse {
        code: coupon.coupon_code,
        valid: true,
        discount_percentage: coupon.discount_percentage,
    }))
}

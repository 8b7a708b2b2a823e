//! Payment HTTP handlers.
//!
//! - POST /api/payment/create-checkout-session - Start an embedded checkout
//! - POST /api/payment/webhook - Provider event delivery (signed)
//! - POST /api/payment/verify-session/{id} - Whether a session was paid
//! - GET /api/payment/config - Publishable key for the storefront

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, header},
};
use serde_json::{Value, json};

use crate::{
    AppState,
    error::AppError,
    models::checkout::{
        CheckoutRequest, CheckoutSessionResponse, PaymentConfigResponse, VerifySessionResponse,
    },
    services::checkout_service::{self, WebhookOutcome},
};

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Create a checkout session for the storefront's basket.
///
/// # Endpoint
///
/// `POST /api/payment/create-checkout-session`
///
/// # Headers
///
/// `Origin` is required; the provider returns the customer to
/// `<origin>/success?session_id=...`.
///
/// # Response
///
/// - **Success (200 OK)**: `{session_id, client_secret}`
/// - **Error (400)**: Missing origin, more than 10 items, invalid items or coupon
/// - **Error (502)**: The provider rejected the request
pub async fn create_checkout_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutSessionResponse>, AppError> {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    Ok(Json(
        checkout_service::create_checkout_session(&state, origin, request).await?,
    ))
}

/// Receive a provider event.
///
/// # Response
///
/// - **Success (200 OK)**: Event applied, ignored or already processed
/// - **Error (400)**: Bad signature or malformed envelope
/// - **Error (500)**: Fulfilment failed; the provider retries
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = checkout_service::handle_webhook(&state, &body, signature).await?;
    let body = match outcome {
        WebhookOutcome::Ignored => json!({ "received": true }),
        WebhookOutcome::Duplicate => json!({ "received": true, "duplicate": true }),
        WebhookOutcome::Fulfilled { order_number } => {
            json!({ "received": true, "order_number": order_number })
        }
    };
    Ok(Json(body))
}

pub async fn verify_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<VerifySessionResponse>, AppError> {
    let success = state.payments.session_is_complete(&session_id).await?;
    Ok(Json(VerifySessionResponse { success }))
}

pub async fn payment_config(State(state): State<Arc<AppState>>) -> Json<PaymentConfigResponse> {
    Json(PaymentConfigResponse {
        publishable_key: state.config.stripe_publishable_key.clone(),
    })
}

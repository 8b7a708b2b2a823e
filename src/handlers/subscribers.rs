//! Newsletter subscription handler.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::{
    AppState,
    error::AppError,
    models::subscriber::{SubscribeRequest, Subscriber},
    services::subscriber_service,
};

/// `POST /subscriber`
///
/// Subscribing twice returns the existing subscription.
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<Subscriber>, AppError> {
    Ok(Json(
        subscriber_service::subscribe(&state.pool, &request.email).await?,
    ))
}

//! Search HTTP handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::{
    AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::{purchase::Purchase, record::RecordResponse},
    services::search_service,
};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(rename = "searchTerm", default)]
    pub search_term: String,
}

/// `GET /search?searchTerm=`
///
/// Matches title, artist or genre name. A blank term returns `[]`.
pub async fn search_records(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<RecordResponse>>, AppError> {
    Ok(Json(
        search_service::search_records(&state.pool, &params.search_term).await?,
    ))
}

/// `GET /search/orders?searchTerm=` (admin)
pub async fn search_orders(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Purchase>>, AppError> {
    auth.ensure_admin()?;
    Ok(Json(
        search_service::search_orders(&state.pool, &params.search_term).await?,
    ))
}

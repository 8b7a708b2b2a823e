//! `GET /health` for load balancers and uptime checks.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `unhealthy`
    pub status: &'static str,
    /// `connected` or `disconnected`
    pub database: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Probe the database with `SELECT 1`.
///
/// 200 when it answers, 503 otherwise; the body has the same shape either way.
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status, database) = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => (StatusCode::OK, "healthy", "connected"),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", "disconnected")
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            database,
            timestamp: Utc::now(),
        }),
    )
}

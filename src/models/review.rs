//! Record review models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A review row from the `reviews` table.
///
/// One review per (user, record) pair; the database enforces it with a
/// unique constraint.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub record_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /reviews`.
#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub user_id: i64,
    pub record_id: i64,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Request body for `PUT /reviews/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

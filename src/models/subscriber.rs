//! Newsletter subscriber models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row from the `subscribers` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
}

/// Request body for `POST /subscriber`.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

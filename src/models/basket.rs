//! Shopping basket models.
//!
//! A basket belongs to exactly one user and holds at most one line per record.
//! Adding a record that is already present merges the quantities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A basket row from the `baskets` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Basket {
    pub id: i64,
    pub user_id: i64,
}

/// A basket line from the `basket_items` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize, PartialEq)]
pub struct BasketItem {
    pub record_id: i64,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

/// Request body for `POST /basket/add`.
#[derive(Debug, Deserialize)]
pub struct AddToBasketRequest {
    pub user_id: i64,
    pub record_id: i64,
    pub quantity: i32,
}

/// Request body for `PUT /basket/update`.
#[derive(Debug, Deserialize)]
pub struct UpdateBasketItemRequest {
    pub user_id: i64,
    pub record_id: i64,
    pub quantity: i32,
}

/// Response body for basket endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct BasketResponse {
    pub id: i64,
    pub user_id: i64,
    pub items: Vec<BasketItem>,
}

/// Response body for `GET /basket/{user_id}/total`.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct BasketTotalResponse {
    pub user_id: i64,
    pub item_count: i64,
    pub total_cents: i64,
}

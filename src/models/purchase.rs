//! Purchase history models and admin statistics.
//!
//! This module defines:
//! - `Purchase`: One line of a completed order (one record, one quantity)
//! - `CreatePurchaseRequest`: Input to the transactional purchase operation
//! - `PurchaseStats` / `AdminDashboard`: Aggregates for the admin views
//!
//! Lines of the same order share an `order_number` of the form `ORD-XXXXXXXX`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status written on every purchase row.
pub const STATUS_COMPLETED: &str = "COMPLETED";

/// Represents a purchase row from the database.
///
/// # Database Table
///
/// Maps to the `purchase_history` table. `user_id` is `None` for guest
/// checkouts. `price_cents` is the unit price actually charged, i.e. after any
/// coupon discount, and `total_cents = price_cents * quantity`.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Purchase {
    pub id: i64,
    pub order_number: String,
    pub user_id: Option<i64>,
    pub is_guest: bool,
    pub purchase_date: DateTime<Utc>,
    pub status: String,
    pub record_id: i64,
    pub quantity: i32,
    pub price_cents: i64,
    pub total_cents: i64,
    pub discount_percentage: Option<i32>,
}

/// Input for creating a purchase row.
///
/// Posted directly by admins to `POST /purchase-history`, and built by the
/// checkout flow for each paid item.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePurchaseRequest {
    #[serde(default)]
    pub user_id: Option<i64>,

    #[serde(default)]
    pub is_guest: bool,

    pub record_id: i64,

    pub quantity: i32,

    /// Unit price in cents, discount already applied.
    pub price_cents: i64,

    /// Generated when absent.
    #[serde(default)]
    pub order_number: Option<String>,

    #[serde(default)]
    pub discount_percentage: Option<i32>,
}

/// Units sold for a single record.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize, PartialEq)]
pub struct RecordSales {
    pub record_id: i64,
    pub units_sold: i64,
}

/// Response body for `GET /purchase-history/stats`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PurchaseStats {
    pub total_orders: i64,
    pub total_revenue_cents: i64,
    pub units_per_record: Vec<RecordSales>,
    pub average_order_value_cents: i64,
}

/// Response body for `GET /purchase-history/admin/dashboard`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminDashboard {
    pub total_orders: i64,
    pub total_revenue_cents: i64,
    pub active_users: usize,
    pub recent_purchases: Vec<Purchase>,
}

//! Guest checkout models.
//!
//! Guests buy without an account; their contact details are stored against
//! the purchase rows of their order.

use serde::{Deserialize, Serialize};

/// Contact and shipping details supplied by a guest at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuestDetails {
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub address: String,
    pub postal_code: String,
    pub country: String,
    pub city: String,
    #[serde(default)]
    pub region: String,
    pub phone_number: String,
}

/// A row from the `guest_orders` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct GuestOrder {
    pub id: i64,
    pub purchase_history_id: i64,
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub address: String,
    pub postal_code: String,
    pub country: String,
    pub city: String,
    pub region: Option<String>,
    pub phone_number: String,
}

/// Request body for `POST /guest-orders`.
#[derive(Debug, Deserialize)]
pub struct CreateGuestOrderRequest {
    pub purchase_history_id: i64,
    #[serde(flatten)]
    pub details: GuestDetails,
}
